//! End-to-end scenarios driven entirely through the `Registry` facade.

use inkdb::{EngineConfig, Key, Registry, RegistryError};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Leg {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Row {
    string: String,
    int: i64,
}

fn config(dir: &TempDir, max_rows_per_segment: u32) -> EngineConfig {
    EngineConfig {
        max_rows_per_segment,
        root: dir.path().to_path_buf(),
    }
}

#[test]
fn scenario_1_single_append_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::open(config(&dir, 1000)).unwrap();
    registry.create_table::<Leg>("legs").unwrap();
    registry
        .append(
            "legs",
            &Leg {
                name: "bob".to_string(),
            },
        )
        .unwrap();

    let (values, keys) = registry
        .get::<Leg>("legs", Key::from_u32(0x00000000), Key::from_u32(0x00000001))
        .unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(keys[0], Key::from_u32(0x00000001));
    assert_eq!(
        values[0],
        Leg {
            name: "bob".to_string()
        }
    );
}

#[test]
fn scenario_2_and_3_spanning_two_segments_and_ranged_scan() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::open(config(&dir, 10)).unwrap();
    registry.create_table::<Row>("rows").unwrap();

    let records: Vec<Row> = (0..20)
        .map(|i| Row {
            string: format!("stored:{i}"),
            int: i,
        })
        .collect();

    let mut keys = Vec::new();
    for record in &records {
        keys.push(registry.append("rows", record).unwrap());
    }
    registry.commit().unwrap();

    // scenario 2: point lookups
    for i in 1..=20u32 {
        let key = Key::from_u32(i);
        let (values, got_keys) = registry.get::<Row>("rows", key, key).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(got_keys[0], key);
        assert_eq!(values[0], records[(i - 1) as usize]);
    }

    // scenario 3: range spanning the segment boundary
    let (values, got_keys) = registry
        .get::<Row>("rows", Key::from_u32(8), Key::from_u32(12))
        .unwrap();
    assert_eq!(values.len(), 5);
    for (offset, i) in (8..=12u32).enumerate() {
        assert_eq!(got_keys[offset], Key::from_u32(i));
        assert_eq!(values[offset], records[(i - 1) as usize]);
    }
}

#[test]
fn scenario_4_duplicate_table_rejection() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::open(config(&dir, 100)).unwrap();
    registry.create_table::<Leg>("legs").unwrap();
    assert!(matches!(
        registry.create_table::<Leg>("legs"),
        Err(RegistryError::TableExists(name)) if name == "legs"
    ));
}

#[test]
fn scenario_5_unknown_table_rejection() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::open(config(&dir, 100)).unwrap();
    let result = registry.append(
        "legs",
        &Leg {
            name: "bob".to_string(),
        },
    );
    assert!(matches!(
        result,
        Err(RegistryError::TableNotFound(name)) if name == "legs"
    ));
}

#[test]
fn scenario_6_persistence_across_reopen() {
    let dir = TempDir::new().unwrap();
    let mut keys = Vec::new();
    {
        let mut registry = Registry::open(config(&dir, 100)).unwrap();
        registry.create_table::<Row>("t").unwrap();
        for i in 0..1000 {
            keys.push(
                registry
                    .append(
                        "t",
                        &Row {
                            string: format!("{i:010}"),
                            int: i,
                        },
                    )
                    .unwrap(),
            );
        }
        registry.commit().unwrap();
    }
    {
        let mut registry = Registry::open(config(&dir, 100)).unwrap();
        let (values, got_keys) = registry
            .get::<Row>("t", Key::from_u32(0), Key::from_u32(0x400))
            .unwrap();
        assert_eq!(values.len(), 1000);
        assert_eq!(got_keys, keys);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(value.int, i as i64);
        }
    }
}

#[test]
fn scenario_7_key_arithmetic() {
    // scaled down from a much larger range to keep the suite fast.
    for i in 0u32..(1 << 16) {
        assert_eq!(Key::ZERO.plus(i).next(), Key::ZERO.plus(i + 1));
        assert_eq!(Key::ZERO.plus(i).to_u32(), i);
    }
}

#[test]
fn idempotent_commit_is_a_no_op_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::open(config(&dir, 10)).unwrap();
    registry.create_table::<Leg>("legs").unwrap();
    for i in 0..15 {
        registry
            .append(
                "legs",
                &Leg {
                    name: format!("leg-{i}"),
                },
            )
            .unwrap();
    }
    registry.commit().unwrap();

    let segments_dir = dir.path().join("inksacks").join("legs").join("segments");
    let snapshot = |dir: &std::path::Path| -> Vec<(String, Vec<u8>)> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap())
            .map(|e| {
                (
                    e.file_name().to_string_lossy().into_owned(),
                    std::fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    };

    let before = snapshot(&segments_dir);
    registry.commit().unwrap();
    let after = snapshot(&segments_dir);
    assert_eq!(before, after);
}
