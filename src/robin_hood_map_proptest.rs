#![cfg(test)]

// Property tests for RobinHoodMap kept inside the crate so they can call
// the test-only `check_invariants`.

use crate::config::TableConfig;
use crate::digest::first_byte::FirstByte;
use crate::robin_hood_map::{PutOutcome, RobinHoodMap};
use core::hash::BuildHasher;
use hashbrown::HashMap;
use proptest::prelude::*;

const KEY_SIZE: usize = 4;

type Key = [u8; KEY_SIZE];

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, u64),
    Get(usize),
    Delete(usize),
    Contains(Key),
    Mutate(usize, u8),
    Iterate,
}

fn arb_scenario(first_byte_max: u8) -> impl Strategy<Value = (Vec<Key>, Vec<OpI>)> {
    proptest::collection::vec(
        (0..=first_byte_max, any::<[u8; 3]>()).prop_map(|(b, r)| [b, r[0], r[1], r[2]]),
        1..=48,
    )
    .prop_flat_map(move |pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            3 => (idx.clone(), any::<u64>()).prop_map(|(i, v)| OpI::Put(i, v)),
            1 => idx.clone().prop_map(OpI::Get),
            2 => idx.clone().prop_map(OpI::Delete),
            1 => (0..=first_byte_max, any::<[u8; 3]>())
                .prop_map(|(b, r)| OpI::Contains([b, r[0], r[1], r[2]])),
            1 => (idx.clone(), any::<u8>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn arb_config() -> impl Strategy<Value = TableConfig> {
    (1usize..24, 1.1f64..3.0, 0.3f64..0.95).prop_map(|(cap, g, lf)| {
        TableConfig::default()
            .initial_capacity(cap)
            .growth_factor(g)
            .max_load_factor(lf)
    })
}

// Drives `sut` and a model keyed by `identity(key)` through `ops`.
fn run_state_machine<S, F>(
    mut sut: RobinHoodMap<S>,
    pool: &[Key],
    ops: Vec<OpI>,
    identity: F,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
    F: Fn(&Key) -> Key,
{
    let mut model: HashMap<Key, u64> = HashMap::new();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = pool[i];
                let already = model.contains_key(&identity(&k));
                let out = sut.put(&k, &v.to_le_bytes()).expect("sizes match");
                prop_assert_eq!(out.is_overwrite(), already);
                prop_assert_eq!(
                    out,
                    if already { PutOutcome::Overwritten } else { PutOutcome::Inserted }
                );
                model.insert(identity(&k), v);
            }
            OpI::Get(i) => {
                let k = pool[i];
                let got = sut
                    .get(&k)
                    .expect("sizes match")
                    .map(|b| u64::from_le_bytes(b.try_into().unwrap()));
                prop_assert_eq!(got, model.get(&identity(&k)).copied());
            }
            OpI::Delete(i) => {
                let k = pool[i];
                let removed = sut.delete(&k).expect("sizes match");
                prop_assert_eq!(removed, model.remove(&identity(&k)).is_some());
                prop_assert!(sut.get(&k).unwrap().is_none());
            }
            OpI::Contains(k) => {
                prop_assert_eq!(
                    sut.contains_key(&k).unwrap(),
                    model.contains_key(&identity(&k))
                );
            }
            OpI::Mutate(i, d) => {
                let k = pool[i];
                if let Some(rec) = sut.get_mut(&k).unwrap() {
                    rec[0] = rec[0].wrapping_add(d);
                    let mv = model.get_mut(&identity(&k)).expect("present in model");
                    let mut bytes = mv.to_le_bytes();
                    bytes[0] = bytes[0].wrapping_add(d);
                    *mv = u64::from_le_bytes(bytes);
                } else {
                    prop_assert!(!model.contains_key(&identity(&k)));
                }
            }
            OpI::Iterate => {
                let mut s_vals: Vec<u64> = sut
                    .iter()
                    .map(|(_, b)| u64::from_le_bytes(b.try_into().unwrap()))
                    .collect();
                let mut m_vals: Vec<u64> = model.values().copied().collect();
                s_vals.sort_unstable();
                m_vals.sort_unstable();
                prop_assert_eq!(s_vals, m_vals);
            }
        }

        // Post-conditions after each op
        sut.check_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: State-machine equivalence against hashbrown::HashMap with the
// default SipHash digest. Invariants exercised across random operation sequences:
// - put reports Inserted/Overwritten exactly as the model predicts.
// - get/contains_key parity; deleted keys never resolve.
// - get_mut edits are observed by later reads.
// - iter yields each live record exactly once.
// - free stack and slots partition the backing indices; probe lengths match
//   distance from home; len parity after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(u8::MAX), config in arb_config()) {
        let sut = RobinHoodMap::with_config(8, KEY_SIZE, config).unwrap();
        run_state_machine(sut, &pool, ops, |k| *k)?;
    }
}

// Property: Same state-machine invariants as above, with digest = first key
// byte. Keys sharing a first byte are one logical key and homes cluster into a
// handful of adjacent slots. This stresses displacement, backward shift across
// long runs, and overwrite-by-digest semantics.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(40), config in arb_config()) {
        let sut = RobinHoodMap::with_config_and_hasher(8, KEY_SIZE, config, FirstByte).unwrap();
        run_state_machine(sut, &pool, ops, |k| [k[0], 0, 0, 0])?;
    }
}
