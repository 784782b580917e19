use pretty_assertions::assert_eq;

use super::*;

fn txn_method() -> MethodDecl {
	MethodDecl {
		name: "WT_SESSION.begin_transaction".into(),
		compilable: true,
		keys: vec![
			KeyDecl::new("sync", KeyType::Boolean),
			KeyDecl::new("isolation", KeyType::String)
				.with_default("snapshot")
				.with_choices(["read-uncommitted", "read-committed", "snapshot"]),
			KeyDecl::new("roundup_timestamps", KeyType::Category).with_sub(vec![
				KeyDecl::new("read", KeyType::Boolean).with_default("false"),
				KeyDecl::new("prepared", KeyType::Boolean).with_default("false"),
			]),
			KeyDecl::new("priority", KeyType::Int).with_default("0"),
			KeyDecl::new("name", KeyType::String),
		],
	}
}

#[test]
fn keys_sorted_at_every_level() {
	let schema = finalize(vec![txn_method()]).unwrap();
	let method = &schema.methods[0];
	let names: Vec<_> = method.keys.keys.iter().map(|k| k.name.as_str()).collect();
	assert_eq!(
		names,
		["isolation", "name", "priority", "roundup_timestamps", "sync"]
	);
	let sub = method.keys.lookup("roundup_timestamps").unwrap().sub.as_ref().unwrap();
	let sub_names: Vec<_> = sub.keys.iter().map(|k| k.name.as_str()).collect();
	assert_eq!(sub_names, ["prepared", "read"]);
}

#[test]
fn base_string_renders_defaults() {
	let schema = finalize(vec![txn_method()]).unwrap();
	assert_eq!(
		schema.methods[0].base,
		"isolation=snapshot,name=,priority=0,roundup_timestamps=(prepared=false,read=false),sync=false"
	);
}

#[test]
fn capacities_count_nested_nodes_and_slots() {
	let schema = finalize(vec![txn_method()]).unwrap();
	let method = &schema.methods[0];
	assert_eq!((method.node_capacity, method.key_capacity), (2, 7));
}

#[test]
fn jump_table_brackets_first_bytes() {
	let schema = finalize(vec![txn_method()]).unwrap();
	let table = &schema.methods[0].keys;
	assert_eq!(table.jump.len(), JUMP_LEN);
	assert_eq!(table.jump[usize::from(b'i')], 0);
	assert_eq!(table.jump[usize::from(b'n')], 1);
	assert_eq!(table.jump[usize::from(b'p')], 2);
	assert_eq!(table.jump[usize::from(b's')], 4);
	assert_eq!(table.jump[JUMP_LEN - 1], 5);
	for key in &table.keys {
		assert_eq!(table.lookup(&key.name).map(|k| &k.name), Some(&key.name));
	}
	assert!(table.lookup("nam").is_none());
	assert!(table.lookup("names").is_none());
	assert!(table.lookup("").is_none());
	assert!(table.lookup("\u{e9}t\u{e9}").is_none());
}

#[test]
fn key_ids_shared_by_name_and_type() {
	let other = MethodDecl {
		name: "WT_SESSION.commit_transaction".into(),
		compilable: true,
		keys: vec![
			KeyDecl::new("sync", KeyType::String).with_choices(["off", "on"]),
			KeyDecl::new("name", KeyType::String),
		],
	};
	let schema = finalize(vec![txn_method(), other]).unwrap();
	let txn = &schema.methods[0].keys;
	let commit = &schema.methods[1].keys;

	assert_eq!(
		txn.lookup("name").unwrap().key_id,
		commit.lookup("name").unwrap().key_id
	);
	assert_ne!(
		txn.lookup("sync").unwrap().key_id,
		commit.lookup("sync").unwrap().key_id
	);
	// isolation, name, prepared, priority, read, roundup_timestamps, sync/boolean, sync/string
	assert_eq!(schema.key_id_count, 8);
}

#[test]
fn quotes_defaults_with_separators() {
	let method = MethodDecl {
		name: "m".into(),
		compilable: true,
		keys: vec![
			KeyDecl::new("format", KeyType::Format).with_default("a,b"),
			KeyDecl::new("targets", KeyType::List).with_default("(\"x\",\"y\")"),
			KeyDecl::new("label", KeyType::String).with_default("say \"hi\""),
		],
	};
	let schema = finalize(vec![method]).unwrap();
	assert_eq!(
		schema.methods[0].base,
		r#"format="a,b",label="say \"hi\"",targets=("x","y")"#
	);
}

#[test]
fn rejects_malformed_declarations() {
	let with_key = |key: KeyDecl| MethodDecl {
		name: "m".into(),
		compilable: true,
		keys: vec![key],
	};

	let err = finalize(vec![with_key(KeyDecl::new("n", KeyType::Int).with_default("lots"))]);
	assert!(matches!(err, Err(SpecError::InvalidDefault { .. })));

	let err = finalize(vec![with_key(KeyDecl::new("n", KeyType::Int))]);
	assert!(matches!(err, Err(SpecError::InvalidDefault { .. })));

	let err = finalize(vec![with_key(
		KeyDecl::new("b", KeyType::Boolean).with_choices(["x"]),
	)]);
	assert!(matches!(err, Err(SpecError::Unsupported { what: "choices", .. })));

	let err = finalize(vec![with_key(KeyDecl::new("c", KeyType::Category))]);
	assert!(matches!(err, Err(SpecError::EmptyCategory { .. })));

	let err = finalize(vec![with_key(
		KeyDecl::new("s", KeyType::String).with_sub(vec![KeyDecl::new("x", KeyType::Boolean)]),
	)]);
	assert!(matches!(err, Err(SpecError::Unsupported { what: "sub-keys", .. })));

	let err = finalize(vec![with_key(
		KeyDecl::new("c", KeyType::Category)
			.with_choices(["all"])
			.with_sub(vec![KeyDecl::new("a", KeyType::Int).with_default("0")]),
	)]);
	assert_eq!(
		err.unwrap_err().to_string(),
		"method 'm': category key 'c' cannot have both choices and sub-keys"
	);

	let err = finalize(vec![with_key(
		KeyDecl::new("s", KeyType::String)
			.with_choices(["a", "b"])
			.with_default("c"),
	)]);
	assert!(matches!(err, Err(SpecError::InvalidDefault { .. })));

	let err = finalize(vec![with_key(KeyDecl::new("bad key", KeyType::String))]);
	assert!(matches!(err, Err(SpecError::InvalidKeyName { .. })));

	let err = finalize(vec![with_key(KeyDecl::new("n", KeyType::Int).with_default("1")); 2]);
	assert_eq!(err, Err(SpecError::DuplicateMethod("m".into())));
}

#[test]
fn rejects_duplicate_keys_in_nested_tables() {
	let method = MethodDecl {
		name: "m".into(),
		compilable: true,
		keys: vec![KeyDecl::new("c", KeyType::Category).with_sub(vec![
			KeyDecl::new("x", KeyType::Boolean),
			KeyDecl::new("x", KeyType::String),
		])],
	};
	let err = finalize(vec![method]).unwrap_err();
	assert_eq!(err.to_string(), "method 'm' key 'c': duplicate key 'x'");
}

#[test]
fn rejects_methods_beyond_slot_positions() {
	let keys = (0..256)
		.map(|i| KeyDecl::new(format!("k{i}"), KeyType::Boolean))
		.collect();
	let method = MethodDecl {
		name: "wide".into(),
		compilable: true,
		keys,
	};
	assert_eq!(
		finalize(vec![method]),
		Err(SpecError::TooManyKeys {
			method: "wide".into(),
			needed: 256,
		})
	);
}
