/*!
 * Handle Hierarchy Tests
 * Base-level views, downcasts, cross-casts and construction from a base
 */

use handle_kernel::derives;
use handle_kernel::handle::{clone_shared, FromBase, Handle, ObjectHandle};
use handle_kernel::refcount::{RefCounted, SharedPtr};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, Default, PartialEq)]
struct Node {
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Group {
    node: Node,
    children: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Transform {
    group: Group,
    scale: f32,
}

derives!(Group => Node: node);
derives!(Transform => Group: group);
derives!(Transform => Node: group.node);

impl FromBase<Node> for Group {
    fn from_base(base: &Node) -> Self {
        Group {
            node: base.clone(),
            ..Default::default()
        }
    }
}

impl FromBase<Group> for Transform {
    fn from_base(base: &Group) -> Self {
        Transform {
            group: base.clone(),
            scale: 1.0,
        }
    }
}

fn named(name: &str) -> Node {
    Node {
        name: name.to_string(),
    }
}

fn scene() -> Vec<SharedPtr<dyn ObjectHandle<Node>>> {
    vec![
        Handle::create(named("root")).upcast::<Node>(),
        Handle::create(Group::from_base(&named("lights"))).upcast::<Node>(),
        Handle::create(Transform {
            group: Group::from_base(&named("camera_rig")),
            scale: 2.0,
        })
        .upcast::<Node>(),
    ]
}

#[test]
fn test_base_view_reads_every_level() {
    let names: Vec<String> = scene()
        .iter()
        .map(|handle| handle.begin_read().name.clone())
        .collect();
    assert_eq!(names, vec!["root", "lights", "camera_rig"]);
}

#[test]
fn test_edit_through_base_reaches_derived_value() {
    let transform = Handle::create(Transform::default());
    let as_node = transform.clone().upcast::<Node>();

    as_node.begin_edit().name = String::from("renamed");

    assert_eq!(transform.begin_read().group.node.name, "renamed");
    assert_eq!(transform.begin_read_as::<Group>().node.name, "renamed");
    assert_eq!(transform.ref_count(), 2);
}

#[test]
fn test_downcast_recovers_concrete_handle() {
    let mut nodes = scene();
    let transform = nodes.pop().unwrap();

    assert!(transform.is_handle_of::<Transform>());
    assert!(!transform.is_handle_of::<Group>());

    let transform = match transform.downcast_handle::<Group>() {
        Ok(_) => panic!("a transform handle downcast to a group handle"),
        Err(original) => original,
    };
    let concrete = transform.downcast_handle::<Transform>().unwrap();
    assert_eq!(concrete.begin_read().scale, 2.0);
}

#[test]
fn test_cross_cast_between_levels() {
    let as_node = Handle::create(Transform::from_base(&Group::from_base(&named("arm"))))
        .upcast::<Node>();

    let as_group = as_node.clone().cross_cast::<Transform, Group>().unwrap();
    as_group.begin_edit().children.push(String::from("hand"));
    assert!(SharedPtr::ptr_eq(&as_node, &as_group));

    // The object is not a Group, so the Group-to-Node path does not apply
    let rejected = as_node.clone().cross_cast::<Group, Node>();
    assert!(rejected.is_err());

    let concrete = as_node.downcast_handle::<Transform>().unwrap();
    assert_eq!(concrete.begin_read().group.children, vec!["hand"]);
}

#[test]
fn test_clone_through_base_copies_whole_object() {
    let originals = scene();
    let copies: Vec<_> = originals.iter().map(clone_shared).collect();

    for (original, copy) in originals.iter().zip(&copies) {
        assert!(!SharedPtr::ptr_eq(original, copy));
        assert_eq!(original.begin_read().name, copy.begin_read().name);
    }

    // The copy keeps its concrete type and the fields the base does not see
    let copy = copies[2].clone().downcast_handle::<Transform>().unwrap();
    assert_eq!(copy.begin_read().scale, 2.0);

    copies[0].begin_edit().name.push_str("_copy");
    assert_eq!(originals[0].begin_read().name, "root");
}

#[test]
fn test_create_from_base_view() {
    let source = Handle::create(Transform {
        group: Group {
            node: named("source"),
            children: vec![String::from("child")],
        },
        scale: 3.0,
    });

    // Built from the Group part only: scale takes the FromBase default
    let rebuilt = Handle::<Transform>::create_from_base::<Group, _>(&*source);
    assert_eq!(rebuilt.begin_read().group.children, vec!["child"]);
    assert_eq!(rebuilt.begin_read().scale, 1.0);
    assert!(!source.is_write_locked());

    // From a type-erased base pointer
    let erased = source.clone().upcast::<Node>();
    let group = Handle::<Group>::create_from_base::<Node, _>(&*erased);
    assert_eq!(group.begin_read().node.name, "source");
    assert!(group.begin_read().children.is_empty());
}

#[test]
fn test_base_pointer_state() {
    let handle = Handle::create(Group::default()).upcast::<Node>();
    assert!(handle.is_notify_allowed());
    assert_eq!(handle.ref_count(), 1);

    let other = handle.clone();
    assert!(handle.is_shared());
    drop(other);
    assert!(!handle.is_shared());
}
