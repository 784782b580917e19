fn main() {
	confc_spec::compile::build();
}
