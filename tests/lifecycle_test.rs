//! Integration tests for activation, destruction and the build hook.

use std::cell::RefCell;
use std::rc::Rc;

use treesync::application::OutlineRenderer;
use treesync::domain::{
    ElementHandle, ElementSpec, Forest, LifecycleEvent, NodeBehavior, NodeClass, NodeId, Phase,
    RecordStore, Renderer, StructuralRecord, SyncError, SyncResult, TypeRegistry,
};
use treesync::util::testing;

/// Records every element it is asked to create.
#[derive(Default)]
struct CountingRenderer {
    created: Vec<(NodeId, Option<ElementHandle>)>,
}

impl Renderer for CountingRenderer {
    fn create_element(&mut self, spec: &ElementSpec<'_>) -> ElementHandle {
        self.created.push((spec.node, spec.parent));
        ElementHandle(self.created.len() as u64)
    }
}

/// Adds a free marker child during activation.
struct MarkerBehavior {
    marker: Rc<NodeClass>,
}

impl NodeBehavior for MarkerBehavior {
    fn watch_extra(&self, forest: &mut Forest, node: NodeId) -> SyncResult<()> {
        let marker = forest.create(Rc::clone(&self.marker));
        forest.push_child(node, marker.into())
    }
}

fn record_tree() -> (Forest, NodeId) {
    testing::init_test_setup();
    let registry = Rc::new(TypeRegistry::new("node kinds"));
    registry
        .add(None, Rc::new(NodeClass::new("GroupNode").with_tag("group")))
        .unwrap();
    let mut records = RecordStore::new();
    let root = records.insert(StructuralRecord::new("group"), None).unwrap();
    let a = records.insert(StructuralRecord::new("group"), Some(root)).unwrap();
    records.insert(StructuralRecord::new("group"), Some(a)).unwrap();
    records.insert(StructuralRecord::new("group"), Some(root)).unwrap();
    let mut forest = Forest::new(registry, records);
    let id = forest.create_from(root.into()).unwrap();
    (forest, id)
}

fn collect_events(forest: &mut Forest) -> Rc<RefCell<Vec<LifecycleEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    forest.subscribe(move |event| sink.borrow_mut().push(*event));
    events
}

// ============================================================
// watch
// ============================================================

#[test]
fn given_constructed_tree_when_created_then_nothing_is_watching() {
    let (forest, root) = record_tree();

    assert_eq!(forest.node(root).unwrap().phase(), Phase::Constructed);
    assert!(!forest.node(root).unwrap().children_resolved());
}

#[test]
fn given_tree_when_watching_twice_then_one_notification_per_node() {
    // Arrange
    let (mut forest, root) = record_tree();
    let events = collect_events(&mut forest);

    // Act
    forest.watch(root).unwrap();
    forest.watch(root).unwrap();

    // Assert
    let events = events.borrow();
    assert_eq!(events.len(), 4);
    assert!(events
        .iter()
        .all(|e| matches!(e, LifecycleEvent::Watching(_))));
    assert_eq!(events[0], LifecycleEvent::Watching(root));
}

#[test]
fn given_behavior_with_watch_extra_when_watching_then_hook_output_is_synchronized() {
    // Arrange
    testing::init_test_setup();
    let marker = Rc::new(NodeClass::new("MarkerNode").with_tag("marker"));
    let panel = Rc::new(
        NodeClass::new("PanelNode")
            .with_tag("panel")
            .with_behavior(Rc::new(MarkerBehavior { marker })),
    );
    let mut forest = Forest::new(Rc::new(TypeRegistry::new("node kinds")), RecordStore::new());
    let node = forest.create(panel);

    // Act
    forest.watch(node).unwrap();

    // Assert
    let children = forest.children(node).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(forest.parent(children[0]).unwrap(), Some(node));
}

// ============================================================
// destroy
// ============================================================

#[test]
fn given_node_when_destroyed_twice_then_single_notification() {
    // Arrange
    let (mut forest, root) = record_tree();
    forest.watch(root).unwrap();
    let events = collect_events(&mut forest);

    // Act
    forest.destroy(root).unwrap();
    forest.destroy(root).unwrap();

    // Assert
    assert_eq!(*events.borrow(), vec![LifecycleEvent::Destroyed(root)]);
    assert!(forest.node(root).unwrap().is_destroyed());
}

#[test]
fn given_destroyed_parent_when_destroyed_then_children_untouched() {
    let (mut forest, root) = record_tree();
    forest.watch(root).unwrap();
    let children = forest.children(root).unwrap();

    forest.destroy(root).unwrap();

    assert!(children
        .iter()
        .all(|c| forest.node(*c).unwrap().is_watching()));
}

#[test]
fn given_destroyed_mirror_when_resolving_record_then_new_node_dispatched() {
    // Arrange
    let (mut forest, root) = record_tree();
    let record = forest.node(root).unwrap().record().unwrap();
    forest.destroy(root).unwrap();

    // Act
    let replacement = forest.resolve(record.into()).unwrap();

    // Assert
    assert_ne!(replacement, root);
    assert_eq!(forest.mirror_of(record), Some(replacement));
}

#[test]
fn given_unconstructed_node_when_destroyed_then_destroyed() {
    let (mut forest, root) = record_tree();

    forest.destroy(root).unwrap();

    assert_eq!(forest.node(root).unwrap().phase(), Phase::Destroyed);
}

// ============================================================
// build
// ============================================================

#[test]
fn given_tree_when_building_then_children_built_under_parent_element() {
    // Arrange
    let (mut forest, root) = record_tree();
    let mut renderer = CountingRenderer::default();

    // Act
    let handle = forest.build(root, None, &mut renderer).unwrap();

    // Assert
    assert_eq!(handle, ElementHandle(1));
    assert_eq!(renderer.created.len(), 4);
    assert_eq!(renderer.created[0], (root, None));
    let a = forest.children(root).unwrap()[0];
    assert_eq!(renderer.created[1], (a, Some(handle)));
    assert_eq!(forest.node(root).unwrap().element(), Some(handle));
}

#[test]
fn given_built_tree_when_building_again_then_elements_reused() {
    let (mut forest, root) = record_tree();
    let mut renderer = CountingRenderer::default();
    forest.build(root, None, &mut renderer).unwrap();

    forest.build(root, None, &mut renderer).unwrap();

    assert_eq!(renderer.created.len(), 4);
}

#[test]
fn given_outline_renderer_when_building_then_lines_nest() {
    let (mut forest, root) = record_tree();
    let mut renderer = OutlineRenderer::new();

    forest.build(root, None, &mut renderer).unwrap();

    assert_eq!(
        renderer.lines(),
        ["<group>", "  <group>", "    <group>", "  <group>"]
    );
}

#[test]
fn given_destroyed_node_when_building_then_invariant_violation() {
    let (mut forest, root) = record_tree();
    forest.destroy(root).unwrap();

    let result = forest.build(root, None, &mut CountingRenderer::default());

    assert!(matches!(result, Err(SyncError::InvariantViolation(_))));
}
