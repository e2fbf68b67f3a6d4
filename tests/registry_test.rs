//! Integration tests for the type registry and its host aliases.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;

use treesync::domain::{
    NodeClass, RegistryHost, StructuralRecord, SyncError, Tagged, TypeRegistry,
};
use treesync::util::testing;

fn kinds() -> TypeRegistry<NodeClass> {
    testing::init_test_setup();
    TypeRegistry::new("node kinds")
}

// ============================================================
// Registration
// ============================================================

#[test]
fn given_same_class_when_registered_twice_then_second_is_noop() {
    // Arrange
    let registry = kinds();
    let series = Rc::new(NodeClass::new("SeriesNode").with_tag("series"));
    registry.add(None, Rc::clone(&series)).unwrap();

    // Act
    let result = registry.add(Some("series"), Rc::clone(&series));

    // Assert
    assert!(result.is_ok());
    assert_eq!(registry.len(), 1);
}

#[test]
fn given_taken_id_when_registering_other_class_then_duplicate_registration() {
    // Arrange
    let registry = kinds();
    registry
        .add(None, Rc::new(NodeClass::new("SeriesNode").with_tag("series")))
        .unwrap();

    // Act
    let result = registry.add(
        Some("series"),
        Rc::new(NodeClass::new("LineNode").with_tag("line")),
    );

    // Assert
    match result {
        Err(SyncError::DuplicateRegistration {
            id,
            existing,
            attempted,
        }) => {
            assert_eq!(id, "series");
            assert_eq!(existing, "SeriesNode");
            assert_eq!(attempted, "LineNode");
        }
        other => panic!("expected DuplicateRegistration, got {:?}", other),
    }
}

#[test]
fn given_untagged_class_when_registered_with_id_then_class_takes_tag() {
    // Arrange
    let registry = kinds();
    let panel = Rc::new(NodeClass::new("PanelNode"));

    // Act
    registry.add(Some("panel"), Rc::clone(&panel)).unwrap();

    // Assert
    assert_eq!(panel.own_tag().as_deref(), Some("panel"));
    assert!(registry.has_class(&panel));
}

#[test]
fn given_class_without_any_tag_when_registered_without_id_then_configuration_error() {
    let registry = kinds();

    let result = registry.add(None, Rc::new(NodeClass::new("Anonymous")));

    assert!(matches!(result, Err(SyncError::Configuration(_))));
}

#[test]
fn given_subclass_inheriting_tag_when_register_type_without_tag_then_configuration_error() {
    // Arrange
    let registry = kinds();
    let series = Rc::new(NodeClass::new("SeriesNode").with_tag("series"));
    let line = Rc::new(NodeClass::new("LineNode").extends(Rc::clone(&series)));

    // Act
    let result = series.register_type(&registry, None, Some(line));

    // Assert
    assert!(matches!(result, Err(SyncError::Configuration(msg)) if msg.contains("series")));
    assert!(registry.is_empty());
}

#[test]
fn given_subclass_when_register_type_with_explicit_tag_then_registered() {
    // Arrange
    let registry = kinds();
    let series = Rc::new(NodeClass::new("SeriesNode").with_tag("series"));
    let line = Rc::new(NodeClass::new("LineNode").extends(Rc::clone(&series)));

    // Act
    series
        .register_type(&registry, Some("line"), Some(Rc::clone(&line)))
        .unwrap();

    // Assert
    assert!(Rc::ptr_eq(&registry.get("line").unwrap(), &line));
    assert_eq!(line.tag().as_deref(), Some("line"));
}

// ============================================================
// Lookup
// ============================================================

#[rstest]
#[case("series", true)]
#[case("pie", false)]
fn test_lookup_by_string(#[case] tag: &str, #[case] found: bool) {
    let registry = kinds();
    registry
        .add(None, Rc::new(NodeClass::new("SeriesNode").with_tag("series")))
        .unwrap();

    let result = registry.lookup(tag);

    assert_eq!(result.is_ok(), found);
    if !found {
        assert_eq!(result.unwrap_err(), SyncError::UnknownType(tag.to_string()));
    }
}

#[test]
fn given_record_when_looking_up_then_uses_record_tag() {
    let registry = kinds();
    registry
        .add(None, Rc::new(NodeClass::new("SeriesNode").with_tag("series")))
        .unwrap();

    let class = registry.lookup(&StructuralRecord::new("series")).unwrap();

    assert_eq!(class.name(), "SeriesNode");
}

#[test]
fn given_tag_in_cell_when_looking_up_then_reads_through_cell() {
    let registry = kinds();
    registry
        .add(None, Rc::new(NodeClass::new("SeriesNode").with_tag("series")))
        .unwrap();
    let cell = RefCell::new("series".to_string());

    assert!(registry.lookup(&cell).is_ok());
}

#[test]
fn given_untagged_record_when_looking_up_then_unknown_type() {
    let registry = kinds();

    let result = registry.lookup(&StructuralRecord::default());

    assert!(matches!(result, Err(SyncError::UnknownType(_))));
}

// ============================================================
// Invalidation and host aliases
// ============================================================

#[test]
fn given_registered_types_when_invalidating_and_purging_then_entries_removed() {
    // Arrange
    let registry = kinds();
    registry
        .register_type(None, Rc::new(NodeClass::new("SeriesNode").with_tag("series")))
        .unwrap();
    registry
        .register_type(None, Rc::new(NodeClass::new("GroupNode").with_tag("group")))
        .unwrap();

    // Act & Assert
    registry.invalidate_type("series");
    assert!(!registry.has_type("series"));
    assert!(registry.lookup_type("group").is_ok());

    registry.purge_cache();
    assert!(registry.is_empty());
}

#[test]
fn given_two_registries_when_registering_same_tag_then_independent() {
    let encoders = kinds();
    let nodes = kinds();

    encoders
        .add(None, Rc::new(NodeClass::new("A").with_tag("shared")))
        .unwrap();
    nodes
        .add(None, Rc::new(NodeClass::new("B").with_tag("shared")))
        .unwrap();

    assert_eq!(encoders.get("shared").unwrap().name(), "A");
    assert_eq!(nodes.get("shared").unwrap().name(), "B");
}
