//! Concurrency and binding properties of the compiled-configuration registry.

use std::collections::HashSet;

use confc::{BindArg, ConfContext, ConfError, ConfValue, ConfigArg, ConnSettings, Schema};
use proptest::prelude::*;

const TXN: &str = "WT_SESSION.begin_transaction";

fn context(count: u32) -> ConfContext<'static> {
	ConfContext::open(
		Schema::builtin(),
		ConnSettings {
			compile_configuration_count: count,
		},
	)
	.unwrap()
}

#[test]
fn concurrent_precompiles_get_distinct_slots() {
	let ctx = &context(1000);
	let handles: Vec<_> = std::thread::scope(|s| {
		let workers: Vec<_> = (0..8)
			.map(|_| s.spawn(move || (0..50).map(|_| ctx.compile(TXN, "priority=%d").unwrap()).collect::<Vec<_>>()))
			.collect();
		workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
	});

	assert_eq!(handles.len(), 400);
	let slots: HashSet<_> = handles.iter().map(|h| h.slot()).collect();
	assert_eq!(slots.len(), 400);
	assert!(slots.iter().all(|&slot| slot < 400));
	assert_eq!(ctx.len(), 400);
}

#[test]
fn concurrent_precompiles_stop_at_capacity() {
	let ctx = &context(100);
	let results: Vec<_> = std::thread::scope(|s| {
		let workers: Vec<_> = (0..4)
			.map(|_| s.spawn(move || (0..40).map(|_| ctx.compile(TXN, "sync=%d")).collect::<Vec<_>>()))
			.collect();
		workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
	});

	let ok = results.iter().filter(|r| r.is_ok()).count();
	assert_eq!(ok, 100);
	assert!(
		results
			.iter()
			.filter_map(|r| r.as_ref().err())
			.all(|e| matches!(e, ConfError::RegistryFull { max: 100, .. }))
	);
	assert_eq!(ctx.len(), 100);
}

#[test]
fn per_call_compiles_share_templates_across_threads() {
	let ctx = context(10);
	let schema = ctx.schema();
	let id = schema.find(TXN).unwrap();
	std::thread::scope(|s| {
		for priority in 0..4_i64 {
			let ctx = &ctx;
			s.spawn(move || {
				let text = format!("priority={priority}");
				let mut scratch = ctx.scratch(id);
				for _ in 0..100 {
					let tree = ctx.compile_api_call(id, ConfigArg::Text(&text), &mut scratch).unwrap();
					assert_eq!(tree.get("priority"), Some(ConfValue::Num(priority)));
					assert_eq!(tree.get("isolation"), Some(ConfValue::Choice("snapshot")));
				}
			});
		}
	});
}

proptest! {
	/// Binding `%d` yields what compiling the literal directly yields.
	#[test]
	fn prop_bound_int_matches_literal(priority in any::<i64>()) {
		let ctx = context(1);
		let id = ctx.schema().find(TXN).unwrap();
		let handle = ctx.compile(TXN, "priority=%d").unwrap();
		let bound = ctx.bind(handle, &[BindArg::Int(priority)]).unwrap();
		let via_bind = ctx.get_compiled(handle).unwrap().tree().get_bound("priority", &bound);

		let text = format!("priority={priority}");
		let mut scratch = ctx.scratch(id);
		let direct = ctx.compile_api_call(id, ConfigArg::Text(&text), &mut scratch).unwrap().get("priority");
		prop_assert_eq!(via_bind, direct);
		prop_assert_eq!(direct, Some(ConfValue::Num(priority)));
	}

	/// Binding `%s` to a permitted choice yields the same canonical choice as the literal.
	#[test]
	fn prop_bound_choice_matches_literal(
		isolation in prop::sample::select(vec!["read-uncommitted", "read-committed", "snapshot"]),
	) {
		let ctx = context(1);
		let id = ctx.schema().find(TXN).unwrap();
		let handle = ctx.compile(TXN, "isolation=%s").unwrap();
		let bound = ctx.bind(handle, &[isolation.into()]).unwrap();
		let via_bind = ctx.get_compiled(handle).unwrap().tree().get_bound("isolation", &bound);

		let text = format!("isolation={isolation}");
		let mut scratch = ctx.scratch(id);
		let direct = ctx.compile_api_call(id, ConfigArg::Text(&text), &mut scratch).unwrap().get("isolation");
		prop_assert_eq!(via_bind, direct);
	}

	/// Free-form strings bind unchanged.
	#[test]
	fn prop_bound_string_matches_literal(stamp in "[0-9a-f]{1,16}") {
		let ctx = context(1);
		let id = ctx.schema().find(TXN).unwrap();
		let handle = ctx.compile(TXN, "read_timestamp=%s").unwrap();
		let bound = ctx.bind(handle, &[BindArg::Str(&stamp)]).unwrap();
		let via_bind = ctx.get_compiled(handle).unwrap().tree().get_bound("read_timestamp", &bound);

		let text = format!("read_timestamp={stamp}");
		let mut scratch = ctx.scratch(id);
		let direct = ctx.compile_api_call(id, ConfigArg::Text(&text), &mut scratch).unwrap().get("read_timestamp");
		prop_assert_eq!(via_bind, direct);
		prop_assert_eq!(direct, Some(ConfValue::Str(stamp.as_str())));
	}
}
