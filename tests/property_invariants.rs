mod common;

use proptest::prelude::*;
use serde_json::json;

use offline_sync::{
    core::queue::{IdPolicy, MemoryQueue},
    persist::StoreHandle,
    record::QueueDraft,
    replay::{IDEMPOTENCY_HEADER, replay_pass},
    types::RecordId,
};

use common::{Reply, ScriptedTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Accepted,
    Rejected,
    Unreachable,
}

fn fate_strategy() -> impl Strategy<Value = Fate> {
    prop_oneof![
        3 => Just(Fate::Accepted),
        1 => Just(Fate::Rejected),
        1 => Just(Fate::Unreachable),
    ]
}

fn reply_for(fate: Fate) -> Reply {
    match fate {
        Fate::Accepted => Reply::Status(200, json!({ "status": "success" })),
        Fate::Rejected => Reply::Status(422, json!({ "message": "invalid" })),
        Fate::Unreachable => Reply::Unreachable,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #[test]
    fn pass_sends_in_id_order_and_keeps_exactly_the_failures(fates in prop::collection::vec(fate_strategy(), 0..40)) {
        let rt = runtime();
        let (sent, remaining, before) = rt.block_on(async {
            let store = StoreHandle::new(MemoryQueue::with_policy(IdPolicy::Sequential));
            let transport = ScriptedTransport::ok();
            for (i, fate) in fates.iter().enumerate() {
                let endpoint = format!("/r{i}");
                transport.script(&endpoint, reply_for(*fate));
                store
                    .add(QueueDraft::new(endpoint, json!({ "i": i })))
                    .await
                    .expect("add");
            }
            let before = store.list_all().await.expect("list");

            replay_pass(&store, &transport).await.expect("pass");

            let sent: Vec<RecordId> = transport
                .calls()
                .iter()
                .map(|c| c.header_value(IDEMPOTENCY_HEADER).expect("key").parse().expect("id"))
                .collect();
            let remaining = store.list_all().await.expect("list");
            (sent, remaining, before)
        });

        let all_ids: Vec<RecordId> = before.iter().map(|r| r.id).collect();
        prop_assert_eq!(sent, all_ids);

        let expected: Vec<_> = before
            .into_iter()
            .zip(fates.iter())
            .filter(|(_, fate)| **fate != Fate::Accepted)
            .map(|(record, _)| record)
            .collect();
        prop_assert_eq!(remaining, expected);
    }

    #[test]
    fn ids_strictly_increase_under_the_clock_policy(count in 1usize..60) {
        let rt = runtime();
        let ids = rt.block_on(async {
            let store = StoreHandle::new(MemoryQueue::new());
            let mut ids = Vec::new();
            for i in 0..count {
                ids.push(store.add(QueueDraft::new("/custom", json!({ "i": i }))).await.expect("add"));
            }
            ids
        });
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
