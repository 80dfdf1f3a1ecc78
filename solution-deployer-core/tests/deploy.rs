use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use solution_deployer_core::contract::{ItemBase, MockPortal, NewItem, SuccessResponse};
use solution_deployer_core::deploy::{
    create_solution_templates, deploy_templates, DeployProgressCallback,
};
use solution_deployer_core::item_types::ProcessorRegistry;
use solution_deployer_core::model::{ItemProgressStatus, ItemTemplate, TemplateDictionary};
use solution_deployer_core::SolutionError;

const APP_ID: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1";
const MAP_ID: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2";
const SOLUTION_ID: &str = "ccccccccccccccccccccccccccccccc3";

fn base(id: &str, item_type: &str) -> ItemBase {
    ItemBase {
        id: id.to_string(),
        item_type: item_type.to_string(),
        title: format!("title of {id}"),
        owner: "casey".to_string(),
        ..ItemBase::default()
    }
}

#[tokio::test]
async fn test_capture_follows_dependencies_and_skips_unsupported_types() {
    let mut portal = MockPortal::new();
    portal.expect_get_item_base().returning(|id| {
        Ok(match id {
            APP_ID => base(APP_ID, "Web Mapping Application"),
            MAP_ID => base(MAP_ID, "Web Map"),
            _ => base(SOLUTION_ID, "Solution"),
        })
    });
    portal
        .expect_get_item_data()
        .withf(|id| id != SOLUTION_ID)
        .returning(|id| {
            if id == APP_ID {
                Ok(json!({ "values": { "webmap": MAP_ID } }))
            } else {
                Ok(json!({ "operationalLayers": [] }))
            }
        });

    let templates = create_solution_templates(
        &[APP_ID.to_string(), SOLUTION_ID.to_string()],
        &portal,
        &ProcessorRegistry::with_defaults(),
    )
    .await
    .expect("capture should succeed");

    let ids: Vec<&str> = templates.iter().map(|t| t.item_id.as_str()).collect();
    assert_eq!(ids, vec![APP_ID, MAP_ID]);
    assert_eq!(templates[0].dependencies, vec![MAP_ID]);
    assert_eq!(
        templates[0].data["values"]["webmap"],
        format!("{{{{{MAP_ID}.itemId}}}}")
    );
    assert!(templates[1].dependencies.is_empty());
}

fn app_and_map() -> Vec<ItemTemplate> {
    let mut app = ItemTemplate::skeleton(APP_ID, "Web Mapping Application");
    app.item = json!({ "id": format!("{{{{{APP_ID}.itemId}}}}"), "type": "Web Mapping Application", "title": "app" });
    app.data = json!({ "webmap": format!("{{{{{MAP_ID}.itemId}}}}") });
    app.dependencies = vec![MAP_ID.to_string()];

    let mut map = ItemTemplate::skeleton(MAP_ID, "Web Map");
    map.item = json!({ "id": format!("{{{{{MAP_ID}.itemId}}}}"), "type": "Web Map", "title": "map" });
    map.data = json!({ "operationalLayers": [] });

    vec![app, map]
}

fn new_id_for(item: &NewItem) -> String {
    format!("new{}", item.item["title"].as_str().unwrap_or_default())
}

type StatusLog = Arc<Mutex<Vec<(String, ItemProgressStatus)>>>;

fn recording_callback(log: &StatusLog) -> DeployProgressCallback {
    let log = log.clone();
    Arc::new(move |template_id, status| {
        log.lock().unwrap().push((template_id.to_string(), status));
        true
    })
}

#[tokio::test]
async fn test_deploy_creates_dependencies_first_and_resolves_references() {
    let mut portal = MockPortal::new();
    portal
        .expect_create_item()
        .withf(|item: &NewItem| {
            item.folder_id.as_deref() == Some("fld1")
                && item.item.get("id").is_none()
                && (item.item["title"] == "map" || item.data == json!({ "webmap": "newmap" }))
        })
        .times(2)
        .returning(|item| Ok(SuccessResponse::ok(new_id_for(&item))));

    let mut templates = app_and_map();
    templates.push(ItemTemplate::skeleton("site1", "Hub Site Application"));
    let mut dictionary = TemplateDictionary::new();
    dictionary.set_folder_id("fld1");
    let log: StatusLog = Arc::new(Mutex::new(Vec::new()));
    let callback = recording_callback(&log);

    let outcome = deploy_templates(
        &templates,
        &mut dictionary,
        &portal,
        &ProcessorRegistry::with_defaults(),
        Some(&callback),
    )
    .await
    .expect("deployment should succeed");

    let created: Vec<&str> = outcome.created.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(created, vec!["newmap", "newapp"]);
    assert!(!outcome.cancelled);
    assert!(outcome.created.iter().all(|c| !c.post_process));
    assert_eq!(dictionary.item_id_for(APP_ID), Some("newapp"));
    assert_eq!(dictionary.item_id_for(MAP_ID), Some("newmap"));

    let statuses = log.lock().unwrap().clone();
    assert_eq!(
        statuses,
        vec![
            (MAP_ID.to_string(), ItemProgressStatus::Started),
            (MAP_ID.to_string(), ItemProgressStatus::Finished),
            (APP_ID.to_string(), ItemProgressStatus::Started),
            (APP_ID.to_string(), ItemProgressStatus::Finished),
            ("site1".to_string(), ItemProgressStatus::Started),
            ("site1".to_string(), ItemProgressStatus::Ignored),
        ]
    );
}

#[tokio::test]
async fn test_deploy_stops_when_callback_cancels() {
    let mut portal = MockPortal::new();
    portal
        .expect_create_item()
        .times(1)
        .returning(|item| Ok(SuccessResponse::ok(new_id_for(&item))));

    let started = Arc::new(AtomicUsize::new(0));
    let counter = started.clone();
    let statuses: StatusLog = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();
    let callback: DeployProgressCallback = Arc::new(move |template_id, status| {
        sink.lock().unwrap().push((template_id.to_string(), status));
        if status == ItemProgressStatus::Started {
            return counter.fetch_add(1, Ordering::SeqCst) == 0;
        }
        true
    });

    let mut dictionary = TemplateDictionary::new();
    let outcome = deploy_templates(
        &app_and_map(),
        &mut dictionary,
        &portal,
        &ProcessorRegistry::with_defaults(),
        Some(&callback),
    )
    .await
    .expect("cancellation is not an error");

    assert!(outcome.cancelled);
    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.created[0].template_id, MAP_ID);
    assert_eq!(
        statuses.lock().unwrap().last(),
        Some(&(APP_ID.to_string(), ItemProgressStatus::Cancelled))
    );
}

#[tokio::test]
async fn test_deploy_failure_reports_items_created_so_far() {
    let mut portal = MockPortal::new();
    portal.expect_create_item().times(2).returning(|item| {
        if item.item["title"] == "map" {
            Ok(SuccessResponse::ok("newmap"))
        } else {
            Ok(SuccessResponse {
                success: false,
                id: None,
            })
        }
    });

    let mut dictionary = TemplateDictionary::new();
    let failure = deploy_templates(
        &app_and_map(),
        &mut dictionary,
        &portal,
        &ProcessorRegistry::with_defaults(),
        None,
    )
    .await
    .expect_err("app creation should fail");

    assert_eq!(failure.created_ids(), vec!["newmap"]);
    assert!(matches!(
        failure.error,
        SolutionError::CreateFailed { ref item_id, .. } if item_id == APP_ID
    ));
}

#[tokio::test]
async fn test_deploy_rejects_cyclic_templates_before_creating_anything() {
    let mut portal = MockPortal::new();
    portal.expect_create_item().times(0);

    let mut templates = app_and_map();
    templates[1].dependencies = vec![APP_ID.to_string()];

    let mut dictionary = TemplateDictionary::new();
    let failure = deploy_templates(
        &templates,
        &mut dictionary,
        &portal,
        &ProcessorRegistry::with_defaults(),
        None,
    )
    .await
    .expect_err("cycle should be rejected");

    assert!(failure.created.is_empty());
    assert!(matches!(failure.error, SolutionError::CyclicDependency(_)));
}
