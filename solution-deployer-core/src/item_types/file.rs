//! File-backed items (PDF, CSV, packages, ...), copied without scanning.

use async_trait::async_trait;

use crate::contract::{ItemBase, Portal};
use crate::error::SolutionResult;
use crate::item_types::{create_item_in_folder, template_from_item, CreatedItem, ItemProcessor};
use crate::model::{ItemTemplate, TemplateDictionary};

#[derive(Debug, Default, Clone, Copy)]
pub struct FileProcessor;

#[async_trait]
impl ItemProcessor for FileProcessor {
    fn name(&self) -> &str {
        "file"
    }

    async fn convert_item_to_template(
        &self,
        item: &ItemBase,
        portal: &dyn Portal,
    ) -> SolutionResult<ItemTemplate> {
        let mut template = template_from_item(item)?;
        template.data = portal.get_item_data(&item.id).await?;
        template.estimated_deployment_cost_factor = 1.0;
        Ok(template)
    }

    async fn create_item_from_template(
        &self,
        template: &ItemTemplate,
        dictionary: &mut TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<CreatedItem> {
        let mut created = create_item_in_folder(template, dictionary, portal).await?;
        // File content is opaque; nothing to resolve later.
        created.post_process = false;
        Ok(created)
    }
}
