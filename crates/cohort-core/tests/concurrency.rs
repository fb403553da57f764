//! One engine and one definition shared across threads.

use std::sync::Arc;
use std::thread;

use cohort_core::{
    register_builtins, CharacteristicDefinition, Cohort, CohortEngine, EvaluationContext,
    MemoryCache, MemoryDefinitionStore, MemorySubjectSource, Parameter, ParameterType,
    StaticDefinition, Subject,
};
use serde_json::json;

fn engine() -> CohortEngine {
    let subjects = (1..=100)
        .map(|id| Subject::new(id).with_gender(if id % 2 == 0 { "F" } else { "M" }))
        .collect();
    let mut builder = CohortEngine::builder();
    register_builtins(
        &mut builder,
        Arc::new(MemorySubjectSource::new(subjects)),
        Arc::new(MemoryDefinitionStore::new()),
    )
    .unwrap();
    builder.build()
}

#[test]
fn concurrent_evaluations_bind_their_own_parameters() {
    let engine = engine();
    let definition = StaticDefinition::new("Shared", []).parameterized();

    let results: Vec<(u64, Cohort)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8u64)
            .map(|n| {
                let engine = &engine;
                let definition = &definition;
                scope.spawn(move || {
                    let members: Vec<u64> = (n * 10..n * 10 + 5).collect();
                    let ctx = EvaluationContext::new().with_parameter("members", json!(members));
                    (n, engine.evaluate(definition, &ctx).unwrap())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (n, cohort) in results {
        let expected: Cohort = (n * 10..n * 10 + 5).collect();
        assert_eq!(cohort, expected);
    }
    assert!(definition.members.is_empty());
}

#[test]
fn shared_cache_serves_concurrent_readers() {
    let engine = engine();
    let cache = Arc::new(MemoryCache::new());
    let definition = CharacteristicDefinition::new("By gender")
        .with_parameter(Parameter::new("gender", ParameterType::Text));

    thread::scope(|scope| {
        for i in 0..16 {
            let engine = &engine;
            let definition = &definition;
            let cache = cache.clone();
            scope.spawn(move || {
                let gender = if i % 2 == 0 { "F" } else { "M" };
                let ctx = EvaluationContext::with_cache(cache)
                    .with_parameter("gender", json!(gender));
                let cohort = engine.evaluate(definition, &ctx).unwrap();
                assert_eq!(cohort.len(), 50);
                let parity = if gender == "F" { 0 } else { 1 };
                assert!(cohort.iter().all(|id| id.0 % 2 == parity));
            });
        }
    });

    assert_eq!(cache.len(), 2);
}
