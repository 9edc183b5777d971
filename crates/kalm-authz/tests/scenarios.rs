use kalm_authz::{Action, Enforcer, RoleGraph, RoleGrouping};

const DASHBOARD_POLICY: &str = "\
# namespace roles
p, role_ns1Viewer, view, ns1, *
p, role_ns1Editor, edit, ns1, *
p, role_ns1Owner, manage, ns1, *
g, role_ns1Editor, role_ns1Viewer
g, role_ns1Owner, role_ns1Editor

# group bindings
g, ns1Viewer, role_ns1Viewer
g, ns1Editor, role_ns1Editor
g, ns1Owner, role_ns1Owner

# cluster roles
p, role_clusterViewer, view, *, *
g, clusterViewer, role_clusterViewer

# resource-scoped grant
p, Nio, edit, ns2, components/*
";

#[tokio::test]
async fn namespace_viewer_group() {
    let enforcer = Enforcer::new(DASHBOARD_POLICY).await;
    assert!(enforcer.can_view_namespace("ns1Viewer", "ns1"));
    assert!(!enforcer.can_edit_namespace("ns1Viewer", "ns1"));
}

#[tokio::test]
async fn owner_and_editor_chains() {
    let enforcer = Enforcer::new(DASHBOARD_POLICY).await;
    for action in [Action::View, Action::Edit, Action::Manage] {
        assert!(
            enforcer.enforce_action("role_ns1Owner", action, "ns1", "*"),
            "owner should {action}"
        );
    }
    assert!(enforcer.can_view_namespace("role_ns1Editor", "ns1"));
    assert!(enforcer.can_edit_namespace("role_ns1Editor", "ns1"));
    assert!(!enforcer.can_manage_namespace("role_ns1Editor", "ns1"));
}

#[tokio::test]
async fn cluster_viewer_sees_every_namespace() {
    let enforcer = Enforcer::new(DASHBOARD_POLICY).await;
    assert!(enforcer.can_view_namespace("clusterViewer", "ns1"));
    assert!(enforcer.can_view_namespace("clusterViewer", "ns2"));
    assert!(!enforcer.can_edit_namespace("clusterViewer", "ns1"));
}

#[tokio::test]
async fn resource_scoped_grant() {
    let enforcer = Enforcer::new(DASHBOARD_POLICY).await;
    assert!(enforcer.enforce("Nio", "edit", "ns2", "components/abc"));
    assert!(!enforcer.enforce("Nio", "edit", "ns2", "pod/abc"));
}

#[tokio::test]
async fn reload_supersedes_prior_grants() {
    let mut enforcer = Enforcer::new(DASHBOARD_POLICY).await;
    assert!(enforcer.can_view_namespace("ns1Viewer", "ns1"));

    enforcer
        .load_policies("p, role_other, view, ns3, *\ng, otherGroup, role_other\n")
        .await
        .expect("reload");
    assert!(!enforcer.can_view_namespace("ns1Viewer", "ns1"));
    assert!(!enforcer.can_view_namespace("clusterViewer", "ns1"));
    assert!(enforcer.can_view_namespace("otherGroup", "ns3"));
}

#[tokio::test]
async fn malformed_line_does_not_block_the_rest() {
    let text = format!("p, onlyTwoFields\n{DASHBOARD_POLICY}");
    let enforcer = Enforcer::new(&text).await;
    assert_eq!(enforcer.policy_set().skipped().len(), 1);
    assert!(enforcer.can_view_namespace("ns1Viewer", "ns1"));
    assert!(enforcer.enforce("Nio", "edit", "ns2", "components/abc"));
}

#[tokio::test]
async fn action_levels_do_not_imply_each_other() {
    let enforcer = Enforcer::new("p, editor, edit, ns1, *\np, manager, manage, ns1, *\n").await;
    assert!(enforcer.can_edit_namespace("editor", "ns1"));
    assert!(!enforcer.can_view_namespace("editor", "ns1"));
    assert!(!enforcer.can_manage_namespace("editor", "ns1"));
    assert!(enforcer.can_manage_namespace("manager", "ns1"));
    assert!(!enforcer.can_edit_namespace("manager", "ns1"));
    assert!(!enforcer.can_view_namespace("manager", "ns1"));
}

#[tokio::test]
async fn concrete_scope_only_matches_itself() {
    let enforcer = Enforcer::new("p, viewer, view, ns1, *\n").await;
    assert!(enforcer.can_view_namespace("viewer", "ns1"));
    assert!(!enforcer.can_view_namespace("viewer", "ns10"));
    assert!(!enforcer.can_view_namespace("viewer", "*"));
    assert!(!enforcer.can_view_cluster("viewer"));
}

#[tokio::test]
async fn bare_wildcard_resource_matches_everything() {
    let enforcer = Enforcer::new("p, viewer, view, ns1, *\n").await;
    for resource in ["", "*", "components/abc", "pods", "a/b/c/d"] {
        assert!(
            enforcer.can_view("viewer", "ns1", resource),
            "resource {resource:?}"
        );
    }
}

#[test]
fn role_graph_properties_hold_on_cycles() {
    let groupings = vec![
        RoleGrouping::new("a", "b"),
        RoleGrouping::new("b", "c"),
        RoleGrouping::new("c", "a"),
    ];
    let graph = RoleGraph::new(&groupings);
    for subject in ["a", "b", "c", "unrelated"] {
        let roles = graph.expand(subject);
        assert!(roles.contains(subject));
    }
    assert_eq!(graph.expand("a").len(), 3);
    assert_eq!(graph.expand("unrelated").len(), 1);
}

#[tokio::test]
async fn cyclic_policy_text_still_enforces() {
    let enforcer = Enforcer::new(
        "p, role_a, view, ns1, *\n\
         g, role_a, role_b\n\
         g, role_b, role_a\n\
         g, alice, role_b\n",
    )
    .await;
    assert!(enforcer.can_view_namespace("alice", "ns1"));
    assert!(!enforcer.can_edit_namespace("alice", "ns1"));
}

#[tokio::test]
async fn enforcer_is_shareable_across_threads() {
    let enforcer = std::sync::Arc::new(Enforcer::new(DASHBOARD_POLICY).await);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let enforcer = std::sync::Arc::clone(&enforcer);
            std::thread::spawn(move || enforcer.can_view_namespace("ns1Owner", "ns1"))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("thread"));
    }
}
