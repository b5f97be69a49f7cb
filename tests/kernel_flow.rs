//! Integration tests for the request serializer under concurrent callers.

use buzzd::config::KernelConfig;
use buzzd::error::{KernelError, StoreError};
use buzzd::kernel::Kernel;
use buzzd::state::MessageId;
use std::collections::BTreeSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_get_dense_unique_ids() {
    let (kernel, _join) = Kernel::spawn(&KernelConfig::default());

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let kernel = kernel.clone();
            tokio::spawn(async move {
                let name = format!("user{i}");
                kernel.register(&name, "pw").await.unwrap();
                kernel.post(&name, &format!("hello from {name}")).await.unwrap()
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap());
    }

    let expected: BTreeSet<_> = (1..=100).map(MessageId).collect();
    assert_eq!(ids, expected);
    assert_eq!(kernel.stats().await.unwrap().users, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_source_is_applied_in_submission_order() {
    let (kernel, _join) = Kernel::spawn(&KernelConfig::default());
    kernel.register("alice", "pw").await.unwrap();

    // Other sources interleave, but alice's own posts keep their order.
    let noise: Vec<_> = (0..4)
        .map(|i| {
            let kernel = kernel.clone();
            tokio::spawn(async move {
                let name = format!("noise{i}");
                kernel.register(&name, "pw").await.unwrap();
                for n in 0..20 {
                    kernel.post(&name, &n.to_string()).await.unwrap();
                }
            })
        })
        .collect();

    let mut last = MessageId(0);
    for n in 0..20 {
        let id = kernel.post("alice", &format!("#seq {n}")).await.unwrap();
        assert!(id > last);
        last = id;
    }
    for task in noise {
        task.await.unwrap();
    }

    // `messages` has no defined order; ids record the commit order.
    let mut messages = kernel.messages("alice").await.unwrap();
    messages.sort_by_key(|m| m.id);
    let texts: Vec<_> = messages.iter().map(|m| m.text.clone()).collect();
    let expected: Vec<_> = (0..20).map(|n| format!("#seq {n}")).collect();
    assert_eq!(texts, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_registrations_admit_exactly_one() {
    let (kernel, _join) = Kernel::spawn(&KernelConfig::default());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let kernel = kernel.clone();
            tokio::spawn(async move { kernel.register("popular", &format!("pw{i}")).await })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => ok += 1,
            Err(e) => assert_eq!(e, KernelError::Store(StoreError::UsernameTaken)),
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_follows_keep_graph_symmetric() {
    let (kernel, _join) = Kernel::spawn(&KernelConfig::default());
    for i in 0..8 {
        kernel.register(&format!("u{i}"), "pw").await.unwrap();
    }

    let tasks: Vec<_> = (0..8)
        .flat_map(|a| (0..8).map(move |b| (a, b)))
        .filter(|(a, b)| a != b)
        .map(|(a, b)| {
            let kernel = kernel.clone();
            tokio::spawn(async move {
                let (followee, follower) = (format!("u{a}"), format!("u{b}"));
                kernel.follow(&followee, &follower).await.unwrap();
                if (a + b) % 3 == 0 {
                    kernel.unfollow(&followee, &follower).await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..8 {
        let user = kernel.user(&format!("u{i}")).await.unwrap().unwrap();
        for followee in &user.follows {
            let other = kernel.user(followee).await.unwrap().unwrap();
            assert!(other.followers.contains(&user.username));
        }
        for follower in &user.followers {
            let other = kernel.user(follower).await.unwrap().unwrap();
            assert!(other.follows.contains(&user.username));
        }
        assert!(!user.follows.contains(&user.username));
    }
}

#[tokio::test]
async fn test_error_taxonomy_walkthrough() {
    let (kernel, _join) = Kernel::spawn(&KernelConfig::default());

    assert_eq!(
        kernel.register("bad name", "pw").await,
        Err(KernelError::Store(StoreError::InvalidUsername))
    );
    assert_eq!(
        kernel.register("alice", "").await,
        Err(KernelError::Store(StoreError::InvalidPassword))
    );
    kernel.register("alice", "pw").await.unwrap();
    kernel.register("bob", "pw").await.unwrap();

    assert_eq!(
        kernel.follow("alice", "alice").await,
        Err(KernelError::Store(StoreError::SelfFollow))
    );
    assert_eq!(
        kernel.follow("alice", "carol").await,
        Err(KernelError::Store(StoreError::UnknownUser("carol".into())))
    );

    let id = kernel.post("alice", "Hello @bob #rust").await.unwrap();
    kernel.post("alice", "Shouting about #RUST").await.unwrap();

    // The query is lower-cased; the stored text is matched literally.
    let tagged = kernel.tagged("RUST").await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, id);
    assert_eq!(tagged[0].mentions, vec!["bob"]);
    assert_eq!(tagged[0].tags, vec!["rust"]);
    assert!(kernel.messages("bob").await.unwrap().is_empty());
    assert!(kernel.messages("nobody").await.unwrap().is_empty());
}
