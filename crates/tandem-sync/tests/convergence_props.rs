//! Property tests: any sequence of external edits settles into a consistent
//! state, and the engine never writes more often than it is edited.

mod common;

use common::{scenario_config, scenario_statuses, task, Harness};
use proptest::prelude::*;
use tandem_core::{MemoryStore, Snapshot};
use tandem_sync::Evaluation;

const RESOURCES: [&str; 3] = ["Tasks/a.md", "Tasks/b.md", "Projects/c.md"];

#[derive(Debug, Clone)]
enum Edit {
    Status(usize),
    Done(bool),
    Both(usize, bool),
    Unrelated(u8),
}

impl Edit {
    fn changes(&self) -> Snapshot {
        let statuses = scenario_statuses();
        match self {
            Edit::Status(i) => Snapshot::new().with("Status", statuses[*i].name.as_str()),
            Edit::Done(done) => Snapshot::new().with("Done", *done),
            Edit::Both(i, done) => Snapshot::new()
                .with("Status", statuses[*i].name.as_str())
                .with("Done", *done),
            Edit::Unrelated(n) => Snapshot::new().with("Title", format!("rev {n}")),
        }
    }
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let count = scenario_statuses().len();
    prop_oneof![
        (0..count).prop_map(Edit::Status),
        any::<bool>().prop_map(Edit::Done),
        (0..count, any::<bool>()).prop_map(|(i, d)| Edit::Both(i, d)),
        any::<u8>().prop_map(Edit::Unrelated),
    ]
}

/// (resource index, edit, settle afterwards)
fn step_strategy() -> impl Strategy<Value = (usize, Edit, bool)> {
    (0..RESOURCES.len(), edit_strategy(), any::<bool>())
}

fn run(initial: Vec<usize>, steps: Vec<(usize, Edit, bool)>) -> (Vec<Evaluation>, usize) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let statuses = scenario_statuses();
        let store = MemoryStore::new();
        for (id, index) in RESOURCES.iter().zip(&initial) {
            let status = &statuses[*index];
            store.insert(*id, task(&status.name, status.is_done));
        }
        let mut h = Harness::new(store, scenario_config()).await;

        for (resource, edit, settle) in &steps {
            h.edit(RESOURCES[*resource], edit.changes());
            if *settle {
                h.settle().await;
            }
        }
        h.settle().await;

        let evaluations = RESOURCES
            .iter()
            .map(|id| {
                h.engine
                    .evaluate(&(*id).into(), &h.fields(id))
                    .unwrap()
            })
            .collect();
        (evaluations, h.store.write_count())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn edits_always_converge(
        initial in prop::collection::vec(0..3usize, RESOURCES.len()),
        steps in prop::collection::vec(step_strategy(), 1..12),
    ) {
        let edits = steps.len();
        let (evaluations, writes) = run(initial, steps);

        for evaluation in evaluations {
            prop_assert_eq!(evaluation, Evaluation::InSync);
        }
        prop_assert!(writes <= edits, "{} writes for {} edits", writes, edits);
    }

    #[test]
    fn consistent_edits_never_write(
        steps in prop::collection::vec((0..RESOURCES.len(), 0..3usize, any::<bool>()), 1..8),
    ) {
        let statuses = scenario_statuses();
        let steps = steps
            .into_iter()
            .map(|(resource, index, settle)| {
                (resource, Edit::Both(index, statuses[index].is_done), settle)
            })
            .collect();
        let (_, writes) = run(vec![0; RESOURCES.len()], steps);
        prop_assert_eq!(writes, 0);
    }
}
