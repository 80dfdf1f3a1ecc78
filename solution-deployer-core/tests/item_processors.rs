use std::sync::{Arc, Mutex};

use serde_json::json;
use solution_deployer_core::contract::{
    ContentPage, GroupInfo, ItemBase, ItemRef, MockPortal, NewGroup, PortalError,
    SuccessResponse,
};
use solution_deployer_core::item_types::group::{get_group_content_ids, GroupProcessor};
use solution_deployer_core::item_types::notebook::{strip_runtime_props, NotebookProcessor};
use solution_deployer_core::item_types::simple::SimpleProcessor;
use solution_deployer_core::item_types::{Handler, ItemProcessor, ProcessorRegistry};
use solution_deployer_core::model::{ItemTemplate, TemplateDictionary};

const GROUP_ID: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1";
const MAP_ID: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2";
const APP_ID: &str = "ccccccccccccccccccccccccccccccc3";
const STRAY_ID: &str = "ddddddddddddddddddddddddddddddd4";
const SERVICE_NAME_ID: &str = "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeee5";

fn base(id: &str, item_type: &str) -> ItemBase {
    ItemBase {
        id: id.to_string(),
        item_type: item_type.to_string(),
        title: format!("title of {id}"),
        owner: "casey".to_string(),
        modified: 1_600_000_000_000,
        ..ItemBase::default()
    }
}

fn content_item(id: &str) -> ItemRef {
    ItemRef {
        id: id.to_string(),
        item_type: "Web Map".to_string(),
    }
}

#[tokio::test]
async fn test_group_template_collects_content_across_pages() {
    let mut portal = MockPortal::new();
    portal.expect_get_group().returning(|id| {
        Ok(GroupInfo {
            id: id.to_string(),
            title: "Responders".to_string(),
            owner: "casey".to_string(),
            tags: vec!["emergency".to_string()],
            access: Some("org".to_string()),
            ..GroupInfo::default()
        })
    });
    portal
        .expect_get_group_content()
        .times(2)
        .returning(|_, start, num| {
            assert_eq!(num, 100);
            if start == 1 {
                Ok(ContentPage {
                    total: 2,
                    start: 1,
                    num: 100,
                    next_start: 101,
                    items: vec![content_item(MAP_ID)],
                })
            } else {
                Ok(ContentPage {
                    total: 2,
                    start: 101,
                    num: 100,
                    next_start: -1,
                    items: vec![content_item(APP_ID)],
                })
            }
        });

    let template = GroupProcessor
        .convert_item_to_template(&base(GROUP_ID, "Group"), &portal)
        .await
        .expect("group should convert");

    assert_eq!(template.item_type, "Group");
    assert_eq!(template.dependencies, vec![MAP_ID, APP_ID]);
    assert_eq!(template.item["id"], format!("{{{{{GROUP_ID}.itemId}}}}"));
    assert_eq!(template.item["title"], "Responders");
    assert_eq!(template.item["access"], "org");
    assert_eq!(template.estimated_deployment_cost_factor, 2.0);
}

#[tokio::test]
async fn test_group_content_stops_when_next_start_does_not_advance() {
    let mut portal = MockPortal::new();
    portal
        .expect_get_group_content()
        .withf(|id, start, _| id == GROUP_ID && *start == 1)
        .times(1)
        .returning(|_, _, _| {
            Ok(ContentPage {
                total: 5,
                start: 1,
                num: 100,
                next_start: 1,
                items: vec![content_item(MAP_ID)],
            })
        });

    let ids = get_group_content_ids(GROUP_ID, &portal)
        .await
        .expect("listing should succeed");

    assert_eq!(ids, vec![MAP_ID]);
}

#[tokio::test]
async fn test_group_content_stops_on_empty_page() {
    let mut portal = MockPortal::new();
    portal
        .expect_get_group_content()
        .times(1)
        .returning(|_, _, _| {
            Ok(ContentPage {
                total: 3,
                start: 1,
                num: 100,
                next_start: 101,
                items: vec![],
            })
        });

    let ids = get_group_content_ids(GROUP_ID, &portal)
        .await
        .expect("listing should succeed");

    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_group_template_survives_content_failure() {
    let mut portal = MockPortal::new();
    portal.expect_get_group().returning(|id| {
        Ok(GroupInfo {
            id: id.to_string(),
            ..GroupInfo::default()
        })
    });
    portal.expect_get_group_content().returning(|_, _, _| {
        Err(PortalError::Api {
            code: 403,
            message: "You do not have permissions".to_string(),
        })
    });

    let template = GroupProcessor
        .convert_item_to_template(&base(GROUP_ID, "Group"), &portal)
        .await
        .expect("group should convert without its content");

    assert!(template.dependencies.is_empty());
}

#[tokio::test]
async fn test_group_deploy_creates_group_and_shares_members() {
    let mut template = ItemTemplate::skeleton(GROUP_ID, "Group");
    template.item = json!({ "title": "Responders for {{folderId}}", "tags": ["a", "b"] });
    template.dependencies = vec![MAP_ID.to_string(), APP_ID.to_string()];

    let mut dictionary = TemplateDictionary::new();
    dictionary.set_folder_id("fld1");
    dictionary.record_item(MAP_ID, "newmap", None);

    let shared: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let mut portal = MockPortal::new();
    portal
        .expect_create_group()
        .withf(|group: &NewGroup| {
            group.title == "Responders for fld1"
                && group.tags == vec!["a", "b"]
                && group.access == "private"
        })
        .times(1)
        .returning(|_| Ok(SuccessResponse::ok("newgrp")));
    let record = shared.clone();
    portal
        .expect_share_item_with_group()
        .returning(move |item_id, group_id| {
            record
                .lock()
                .unwrap()
                .push((item_id.to_string(), group_id.to_string()));
            Ok(SuccessResponse::ok(item_id))
        });

    let created = GroupProcessor
        .create_item_from_template(&template, &mut dictionary, &portal)
        .await
        .expect("group should be created");
    assert_eq!(created.id, "newgrp");
    assert!(created.post_process);
    assert_eq!(dictionary.item_id_for(GROUP_ID), Some("newgrp"));

    GroupProcessor
        .post_process(&created.id, &template, &[], &dictionary, &portal)
        .await
        .expect("sharing should succeed");
    // APP_ID was never deployed and is skipped.
    assert_eq!(
        *shared.lock().unwrap(),
        vec![("newmap".to_string(), "newgrp".to_string())]
    );
}

#[tokio::test]
async fn test_simple_template_keeps_only_verified_references() {
    let mut portal = MockPortal::new();
    portal.expect_get_item_data().returning(|_| {
        Ok(json!({
            "values": {
                "webmap": MAP_ID,
                "group": GROUP_ID,
                "stray": STRAY_ID,
                "layer": format!("https://host/arcgis/rest/services/{SERVICE_NAME_ID}/FeatureServer/0")
            }
        }))
    });
    portal.expect_get_item_base().returning(|id| {
        if id == MAP_ID {
            Ok(base(id, "Web Map"))
        } else {
            Err(PortalError::NotFound(id.to_string()))
        }
    });
    portal.expect_get_group().returning(|id| {
        if id == GROUP_ID {
            Ok(GroupInfo {
                id: id.to_string(),
                ..GroupInfo::default()
            })
        } else {
            Err(PortalError::NotFound(id.to_string()))
        }
    });

    let template = SimpleProcessor
        .convert_item_to_template(&base(APP_ID, "Web Mapping Application"), &portal)
        .await
        .expect("app should convert");

    // Data keys serialize sorted, so the group is found first.
    assert_eq!(template.dependencies, vec![GROUP_ID, MAP_ID]);
    assert_eq!(template.data["values"]["webmap"], format!("{{{{{MAP_ID}.itemId}}}}"));
    assert_eq!(template.data["values"]["group"], format!("{{{{{GROUP_ID}.itemId}}}}"));
    assert_eq!(template.data["values"]["stray"], STRAY_ID);
    assert!(template.data["values"]["layer"]
        .as_str()
        .unwrap()
        .contains(SERVICE_NAME_ID));
    assert_eq!(template.item["id"], format!("{{{{{APP_ID}.itemId}}}}"));
    assert!(template.item.get("owner").is_none(), "Source-only fields are dropped");
}

#[tokio::test]
async fn test_simple_deploy_resolves_placeholders_and_records_item() {
    let mut template = ItemTemplate::skeleton(APP_ID, "Web Mapping Application");
    template.item = json!({
        "id": format!("{{{{{APP_ID}.itemId}}}}"),
        "type": "Web Mapping Application",
        "title": "Viewer",
        "url": format!("https://host/apps/viewer/index.html?appid={APP_ID}")
    });
    template.data = json!({ "webmap": format!("{{{{{MAP_ID}.itemId}}}}") });

    let mut dictionary = TemplateDictionary::new();
    dictionary.set_folder_id("fld1");
    dictionary.record_item(MAP_ID, "newmap", None);

    let mut portal = MockPortal::new();
    portal
        .expect_create_item()
        .withf(|new_item| {
            new_item.data == json!({ "webmap": "newmap" })
                && new_item.folder_id.as_deref() == Some("fld1")
                && new_item.item.get("id").is_none()
        })
        .times(1)
        .returning(|_| Ok(SuccessResponse::ok("newapp")));

    let created = SimpleProcessor
        .create_item_from_template(&template, &mut dictionary, &portal)
        .await
        .expect("app should be created");

    assert_eq!(created.id, "newapp");
    assert!(!created.post_process);
    assert_eq!(dictionary.item_id_for(APP_ID), Some("newapp"));
    assert_eq!(
        dictionary.get_str(&format!("{APP_ID}.url")),
        Some("https://host/apps/viewer/index.html?appid=newapp")
    );
}

#[tokio::test]
async fn test_failed_creation_is_reported_with_template_id() {
    let template = ItemTemplate::skeleton(MAP_ID, "Web Map");
    let mut dictionary = TemplateDictionary::new();
    let mut portal = MockPortal::new();
    portal
        .expect_create_item()
        .returning(|_| Ok(SuccessResponse::failed("")));

    let result = SimpleProcessor
        .create_item_from_template(&template, &mut dictionary, &portal)
        .await;

    assert!(matches!(
        result,
        Err(solution_deployer_core::SolutionError::CreateFailed { ref item_id, .. }) if item_id == MAP_ID
    ));
    assert_eq!(dictionary.item_id_for(MAP_ID), None);
}

#[test]
fn test_notebook_runtime_props_are_stripped_everywhere() {
    let mut data = json!({
        "metadata": { "interpreter": { "name": "python" }, "papermill": {}, "kernelspec": "k" },
        "cells": [
            { "metadata": { "papermill": { "status": "ok" }, "tags": [] }, "source": "x" },
            { "source": "y" }
        ]
    });

    strip_runtime_props(&mut data);

    assert_eq!(data["metadata"], json!({ "kernelspec": "k" }));
    assert_eq!(data["cells"][0]["metadata"], json!({ "tags": [] }));
    assert_eq!(data["cells"][1], json!({ "source": "y" }));
}

#[tokio::test]
async fn test_notebook_template_templatizes_ids_in_code() {
    let mut portal = MockPortal::new();
    portal.expect_get_item_data().returning(|_| {
        Ok(json!({
            "metadata": { "interpreter": "python" },
            "cells": [ { "source": format!("item = gis.content.get('{MAP_ID}')") } ]
        }))
    });
    portal
        .expect_get_item_base()
        .returning(|id| Ok(base(id, "Web Map")));

    let template = NotebookProcessor
        .convert_item_to_template(&base(APP_ID, "Notebook"), &portal)
        .await
        .expect("notebook should convert");

    assert_eq!(template.dependencies, vec![MAP_ID]);
    assert_eq!(
        template.data["cells"][0]["source"],
        format!("item = gis.content.get('{{{{{MAP_ID}.itemId}}}}')")
    );
    assert!(template.data["metadata"].get("interpreter").is_none());
}

#[test]
fn test_registry_maps_types_to_handlers() {
    let registry = ProcessorRegistry::with_defaults();

    assert!(matches!(registry.handler_for("Web Map"), Handler::Processor(p) if p.name() == "simple"));
    assert!(matches!(registry.handler_for("Dashboard"), Handler::Processor(p) if p.name() == "simple"));
    assert!(matches!(registry.handler_for("Group"), Handler::Processor(p) if p.name() == "group"));
    assert!(matches!(registry.handler_for("Notebook"), Handler::Processor(p) if p.name() == "notebook"));
    assert!(matches!(registry.handler_for("Workforce Project"), Handler::Processor(p) if p.name() == "workforce"));
    assert!(matches!(registry.handler_for("PDF"), Handler::Processor(p) if p.name() == "file"));
    assert!(matches!(registry.handler_for("Solution"), Handler::Unsupported));
    assert!(matches!(registry.handler_for("Hub Site Application"), Handler::Unsupported));
    assert!(matches!(registry.handler_for("Feature Service"), Handler::NotImplemented));
    assert!(matches!(registry.handler_for("Made Up Type"), Handler::NotImplemented));
    assert!(registry.processor_for("Solution").is_err());
}

#[test]
fn test_empty_registry_knows_nothing() {
    let registry = ProcessorRegistry::new();
    assert!(registry.is_empty());
    assert!(matches!(registry.handler_for("Web Map"), Handler::NotImplemented));
}
