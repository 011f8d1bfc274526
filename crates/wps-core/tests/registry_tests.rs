use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wps_core::*;

fn describe(id: &str) -> ProcessDescription {
    ProcessDescription::builder(id)
        .input(InputDescription::builder("x", LiteralDescription::new(LiteralType::Integer)).build())
        .output(OutputDescription::builder("y", LiteralDescription::new(LiteralType::Integer)).build())
        .build()
}

fn identity(description: ProcessDescription) -> Arc<dyn Algorithm> {
    Arc::new(FnAlgorithm::new(description, |ctx: ExecutionContext| async move {
        let mut outputs = ProcessOutputs::new();
        if let Some(x) = ctx.inputs().first("x") {
            outputs.insert("y".to_string(), x.clone());
        }
        Ok::<_, AlgorithmError>(outputs)
    }))
}

#[test]
fn test_register_all_reports_each_failure() {
    let table = AlgorithmTable::new()
        .with_instance("good", identity(describe("good")))
        .with("broken", || Err(AlgorithmError::Failed("no licence".to_string())))
        .with_instance(
            "invalid",
            identity(ProcessDescription::builder("invalid").build()),
        )
        .with_instance("renamed", identity(describe("other")));
    let source = table.select(["good", "broken", "invalid", "renamed", "absent"]);
    let registry = AlgorithmRegistry::new(Arc::new(source));

    let report = registry.register_all();

    assert_eq!(report.loaded, vec![ProcessId::from("good")]);
    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["broken", "invalid", "renamed", "absent"]);
    assert!(!report.is_complete());

    assert!(matches!(
        &report.failed[0].1,
        RegistrationError::Load(LoadError::Instantiation { message, .. }) if message == "no licence"
    ));
    match &report.failed[1].1 {
        RegistrationError::DescriptionInvalid { violations, .. } => {
            assert_eq!(violations.len(), ProtocolVersion::ALL.len());
            assert!(violations
                .iter()
                .all(|v| v.violations.contains(&DescriptionViolation::NoOutputs)));
        }
        other => panic!("unexpected {:?}", other),
    }
    match &report.failed[2].1 {
        RegistrationError::DescriptionInvalid { violations, .. } => {
            assert!(violations[0]
                .violations
                .contains(&DescriptionViolation::IdentifierMismatch {
                    expected: "renamed".to_string(),
                    actual: "other".to_string(),
                }));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        report.failed[3].1,
        RegistrationError::Load(LoadError::NotFound {
            id: "absent".to_string()
        })
    );

    assert_eq!(registry.len(), 1);
    assert!(registry.lookup("broken").is_none());
}

#[test]
fn test_reregistering_replaces_the_entry() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let table = AlgorithmTable::new().with("echo", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(identity(describe("echo")))
    });
    let registry = AlgorithmRegistry::new(Arc::new(table));

    registry.register("echo").unwrap();
    let first = registry.resolve("echo").unwrap();
    registry.register("echo").unwrap();
    let second = registry.resolve("echo").unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len(), 1);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(registry.lookup("echo").unwrap().id, ProcessId::from("echo"));
}

#[test]
fn test_description_valid_for_one_version_is_accepted() {
    let description = ProcessDescription::builder("multi")
        .input(InputDescription::builder("x", LiteralDescription::new(LiteralType::Integer)).build())
        .output(
            OutputDescription::builder("y", LiteralDescription::new(LiteralType::Integer))
                .occurs(1, Some(3))
                .build(),
        )
        .build();
    let table = AlgorithmTable::new().with_instance("multi", identity(description));
    let registry = AlgorithmRegistry::new(Arc::new(table));

    registry.register("multi").unwrap();

    let offering = registry.offering("multi").unwrap();
    assert_eq!(offering.versions, vec![ProtocolVersion::V2_0_0]);
    assert_eq!(offering.capability, ExecutionCapability::SyncOnly);

    let v1_only = AlgorithmRegistry::with_versions(
        Arc::new(AlgorithmTable::new().with_instance("multi", registry.resolve("multi").unwrap())),
        vec![ProtocolVersion::V1_0_0],
    );
    assert!(matches!(
        v1_only.register("multi"),
        Err(RegistrationError::DescriptionInvalid { .. })
    ));
}

#[test]
fn test_list_preserves_registration_order_and_unregister() {
    let table = AlgorithmTable::new()
        .with_instance("b", identity(describe("b")))
        .with_instance("a", identity(describe("a")))
        .with_instance("c", identity(describe("c")));
    let registry = AlgorithmRegistry::new(Arc::new(table));
    assert!(registry.register_all().is_complete());

    let ids: Vec<String> = registry.list().iter().map(|d| d.id.to_string()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);

    assert!(registry.unregister("a"));
    assert!(!registry.unregister("a"));
    let ids: Vec<String> = registry.ids().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[test]
fn test_reregistered_process_keeps_its_listing_position() {
    let table = AlgorithmTable::new()
        .with_instance("b", identity(describe("b")))
        .with_instance("a", identity(describe("a")))
        .with_instance("c", identity(describe("c")));
    let registry = AlgorithmRegistry::new(Arc::new(table));
    assert!(registry.register_all().is_complete());
    let before: Vec<ProcessId> = registry.ids();

    assert!(registry.unregister("a"));
    registry.register("a").unwrap();

    assert_eq!(registry.ids(), before);
    let listed: Vec<String> = registry.list().iter().map(|d| d.id.to_string()).collect();
    assert_eq!(listed, vec!["b", "a", "c"]);
    assert_eq!(registry.lookup("a").map(|d| d.id.to_string()), Some("a".to_string()));
}
