//! Items whose references live in their JSON data: web maps, apps, dashboards.

use async_trait::async_trait;
use tracing::debug;

use crate::contract::{ItemBase, Portal};
use crate::error::SolutionResult;
use crate::id_scanner::scan_ids_excluding_service_names;
use crate::item_types::{
    create_item_in_folder, template_from_item, templatize_verified_ids, CreatedItem,
    ItemProcessor,
};
use crate::model::{ItemTemplate, TemplateDictionary};
use crate::templatization::update_item_template_from_dictionary;

#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleProcessor;

#[async_trait]
impl ItemProcessor for SimpleProcessor {
    fn name(&self) -> &str {
        "simple"
    }

    async fn convert_item_to_template(
        &self,
        item: &ItemBase,
        portal: &dyn Portal,
    ) -> SolutionResult<ItemTemplate> {
        let mut template = template_from_item(item)?;
        template.data = portal.get_item_data(&item.id).await?;

        let serialized = serde_json::to_string(&template.data)?;
        let candidates = scan_ids_excluding_service_names(&serialized);
        debug!(item_id = %item.id, candidates = candidates.len(), "[CAPTURE] Scanned item data");
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
