use proptest::prelude::*;
use tilers::{ExperienceStore, StateVector};

fn distinct_state(index: usize) -> StateVector {
    let mut cells = [0u8; 16];
    cells[0] = (index / 16) as u8 + 1;
    cells[1] = (index % 16) as u8;
    StateVector::from_exponents(cells)
}

proptest! {
    #[test]
    fn store_never_exceeds_capacity(capacity in 1usize..16, inserts in 0usize..64) {
        let mut store = ExperienceStore::new(capacity);
        for index in 0..inserts {
            prop_assert!(store.observe(&distinct_state(index)));
            prop_assert!(store.len() <= capacity);
        }
        prop_assert_eq!(store.len(), inserts.min(capacity));
    }

    #[test]
    fn newest_and_oldest_entries_survive(capacity in 1usize..16, inserts in 1usize..64) {
        let mut store = ExperienceStore::new(capacity);
        for index in 0..inserts {
            store.observe(&distinct_state(index));
        }

        prop_assert!(store.contains(&distinct_state(inserts - 1).key()));
        for index in 0..(capacity - 1).min(inserts) {
            prop_assert!(store.contains(&distinct_state(index).key()));
        }
    }

    #[test]
    fn updates_do_not_change_membership(
        capacity in 1usize..8,
        updates in prop::collection::vec((0usize..16, 0usize..4, -100.0f32..100.0), 0..32),
    ) {
        let mut store = ExperienceStore::new(capacity);
        for index in 0..capacity {
            store.observe(&distinct_state(index));
        }
        let len = store.len();
        for (index, action, value) in updates {
            let key = distinct_state(index).key();
            let stored = store.contains(&key);
            prop_assert_eq!(store.update(&key, action, value), stored);
            if stored {
                prop_assert_eq!(store.action_values(&key).map(|values| values[action]), Some(value));
            }
        }
        prop_assert_eq!(store.len(), len);
    }
}
