//! Concurrent operations on one application are serialized by path locks.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use appgit::git::GitError;
use common::{branch, master, write_files, Fixture};

#[test]
fn concurrent_commits_are_serialized() {
    let fx = Fixture::new();
    let path = fx.local_app("app", &[("base.json", "0")]);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["one", "two"]
        .into_iter()
        .map(|name| {
            let service = fx.service.clone();
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let file = format!("{name}.json");
                write_files(&path, &[(file.as_str(), name)]);
                barrier.wait();
                service.commit_application(&path, name, "Ada", "ada@example.com")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let committed = results.iter().filter(|r| r.is_ok()).count();
    for result in &results {
        match result {
            Ok(_) | Err(GitError::NothingToCommit) => {}
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }
    assert!(committed >= 1);

    let history = fx.service.get_commit_history(&fx.suffix("app")).unwrap();
    assert_eq!(history.len(), 1 + committed);
    assert!(fx.service.get_status(&path, &master()).unwrap().is_clean());
}

#[test]
fn concurrent_branch_creation_yields_one_winner() {
    let fx = Fixture::new();
    fx.local_app("app", &[("base.json", "0")]);
    let suffix = fx.suffix("app");
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = fx.service.clone();
            let suffix = suffix.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create_and_checkout_to_branch(&suffix, &branch("dev"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");

    let dev_path = fx.service.repo_path(&suffix, Some(&branch("dev"))).unwrap();
    assert!(fx.service.get_status(&dev_path, &branch("dev")).unwrap().is_clean());
}

#[test]
fn readers_run_alongside_each_other() {
    let fx = Fixture::new();
    fx.local_app("app", &[("base.json", "0")]);
    let suffix = fx.suffix("app");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = fx.service.clone();
            let suffix = suffix.clone();
            thread::spawn(move || service.get_commit_history(&suffix).map(|h| h.len()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }
}
