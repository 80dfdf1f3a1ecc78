//! Python notebooks.

use async_trait::async_trait;
use serde_json::Value;

use crate::contract::{ItemBase, Portal};
use crate::error::SolutionResult;
use crate::id_scanner::scan_ids;
use crate::item_types::{
    create_item_in_folder, template_from_item, templatize_verified_ids, CreatedItem,
    ItemProcessor,
};
use crate::model::{ItemTemplate, TemplateDictionary};
use crate::templatization::{delete_props, update_item_template_from_dictionary};

/// Execution metadata the platform regenerates on each run.
const RUNTIME_PROPS: &[&str] = &["metadata.interpreter", "metadata.papermill"];

#[derive(Debug, Default, Clone, Copy)]
pub struct NotebookProcessor;

/// Strips runtime metadata from the notebook and from each of its cells.
pub fn strip_runtime_props(data: &mut Value) {
    if data.is_null() {
        return;
    }
    delete_props(data, RUNTIME_PROPS);
    if let Some(Value::Array(cells)) = data.get_mut("cells") {
        for cell in cells {
            delete_props(cell, RUNTIME_PROPS);
        }
    }
}

#[async_trait]
impl ItemProcessor for NotebookProcessor {
    fn name(&self) -> &str {
        "notebook"
    }

    async fn convert_item_to_template(
        &self,
        item: &ItemBase,
        portal: &dyn Portal,
    ) -> SolutionResult<ItemTemplate> {
        let mut template = template_from_item(item)?;
        let mut data = portal.get_item_data(&item.id).await?;
        strip_runtime_props(&mut data);
        template.data = data;

        // Code cells embed ids anywhere, so no service-name filtering here.
        let candidates = scan_ids(&serde_json::to_string(&template.data)?);
        templatize_verified_ids(&mut template, candidates, portal).await?;
        Ok(template)
    }

    async fn create_item_from_template(
        &self,
        template: &ItemTemplate,
        dictionary: &mut TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<CreatedItem> {
        create_item_in_folder(template, dictionary, portal).await
    }

    async fn post_process(
        &self,
        item_id: &str,
        _template: &ItemTemplate,
        _templates: &[ItemTemplate],
        dictionary: &TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<()> {
        update_item_template_from_dictionary(item_id, dictionary, portal).await?;
        Ok(())
    }
}
