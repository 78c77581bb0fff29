//! Concurrency stress tests
//!
//! Many threads binding and dispatching at once must leave the registry
//! consistent and every owner holding the value dispatched for its key.

mod common;

use common::{Counter, counter_members, shared};
use confbind::{BindingProcessor, BindingRegistry, MemoryConfigService, UpdateDispatcher};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 16;

#[test]
fn test_concurrent_discovery_then_dispatch() {
    common::init_logger();
    let registry = Arc::new(BindingRegistry::new());
    let service = Arc::new(MemoryConfigService::new());
    let processor = Arc::new(BindingProcessor::new(Arc::clone(&registry), service));
    let dispatcher = Arc::new(UpdateDispatcher::new(Arc::clone(&registry)));

    let owners: Vec<_> = (0..THREADS).map(|_| shared(Counter::default())).collect();

    // Phase 1: every thread binds its own owner to its own key
    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = vec![];
    for (i, owner) in owners.iter().enumerate() {
        let p = Arc::clone(&processor);
        let b = Arc::clone(&barrier);
        let owner = Arc::clone(owner);
        handles.push(thread::spawn(move || {
            b.wait();
            p.process_members(&owner, counter_members(&format!("counter.{i}")))
                .unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.len(), THREADS);

    // Phase 2: every thread dispatches its own key
    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = vec![];
    for i in 0..THREADS {
        let d = Arc::clone(&dispatcher);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            let report = d.on_key_changed(&format!("counter.{i}"), &(i * 10).to_string());
            assert_eq!(report.applied, 1);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), THREADS);
    for (i, owner) in owners.iter().enumerate() {
        assert_eq!(owner.read().unwrap().value, (i * 10) as i32);
    }
}

#[test]
fn test_bind_and_dispatch_interleaved() {
    common::init_logger();
    let registry = Arc::new(BindingRegistry::new());
    let service = Arc::new(MemoryConfigService::new());
    let processor = Arc::new(BindingProcessor::new(Arc::clone(&registry), service));
    let dispatcher = Arc::new(UpdateDispatcher::new(Arc::clone(&registry)));

    let owners: Vec<_> = (0..THREADS).map(|_| shared(Counter::default())).collect();
    let barrier = Arc::new(Barrier::new(THREADS * 2));
    let mut handles = vec![];

    for (i, owner) in owners.iter().enumerate() {
        let p = Arc::clone(&processor);
        let b = Arc::clone(&barrier);
        let owner = Arc::clone(owner);
        handles.push(thread::spawn(move || {
            b.wait();
            p.process_members(&owner, counter_members("shared.key")).unwrap();
        }));

        let d = Arc::clone(&dispatcher);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            // Sees some prefix of the registrations; must never fail
            let report = d.on_key_changed("shared.key", "1");
            assert!(report.is_success());
            assert!(report.applied <= THREADS);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.bindings_for("shared.key").len(), THREADS);

    let report = dispatcher.on_key_changed("shared.key", "42");
    assert_eq!(report.applied, THREADS);
    for owner in &owners {
        assert_eq!(owner.read().unwrap().value, 42);
    }
}

#[test]
fn test_concurrent_config_changes() {
    common::init_logger();
    let fixture = common::TestFixture::new();
    let owners: Vec<_> = (0..THREADS).map(|_| shared(Counter::default())).collect();
    for (i, owner) in owners.iter().enumerate() {
        fixture
            .binder
            .bind_members(owner, counter_members(&format!("live.{i}")))
            .unwrap();
    }

    let fixture = Arc::new(fixture);
    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = vec![];
    for i in 0..THREADS {
        let f = Arc::clone(&fixture);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            f.set(&format!("live.{i}"), &(i + 1).to_string());
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for (i, owner) in owners.iter().enumerate() {
        assert_eq!(owner.read().unwrap().value, (i + 1) as i32);
    }
}
