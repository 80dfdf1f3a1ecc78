//! Item type to processor lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{SolutionError, SolutionResult};
use crate::item_types::file::FileProcessor;
use crate::item_types::group::GroupProcessor;
use crate::item_types::notebook::NotebookProcessor;
use crate::item_types::simple::SimpleProcessor;
use crate::item_types::workforce::WorkforceProcessor;
use crate::item_types::ItemProcessor;

/// How an item type is handled.
#[derive(Clone)]
pub enum Handler {
    Processor(Arc<dyn ItemProcessor>),
    /// Known type that must never be templated.
    Unsupported,
    /// Known or unknown type without a processor yet.
    NotImplemented,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Processor(processor) => write!(f, "Processor({})", processor.name()),
            Handler::Unsupported => write!(f, "Unsupported"),
            Handler::NotImplemented => write!(f, "NotImplemented"),
        }
    }
}

pub const UNSUPPORTED_TYPES: &[&str] = &[
    "Solution",
    "Hub Initiative",
    "Site Initiative",
    "Code Attachment",
    "Hub Site Application",
    "Site Application",
    "Hub Page",
    "Site Page",
    "Unsupported",
];

pub const SIMPLE_TYPES: &[&str] = &["Web Map", "Web Mapping Application", "Dashboard"];

/// Item types copied as opaque files.
pub const FILE_TYPES: &[&str] = &[
    "360 VR Experience",
    "AppBuilder Extension",
    "AppBuilder Widget Package",
    "Application Configuration",
    "ArcGIS Pro Add In",
    "ArcGIS Pro Configuration",
    "ArcPad Package",
    "Basemap Package",
    "CAD Drawing",
    "CityEngine Web Scene",
    "Code Sample",
    "Color Set",
    "Compact Tile Package",
    "CSV Collection",
    "CSV",
    "Deep Learning Package",
    "Desktop Add In",
    "Desktop Application Template",
    "Desktop Style",
    "Document Link",
    "Explorer Add In",
    "Explorer Layer",
    "Explorer Map",
    "Feature Collection Template",
    "File Geodatabase",
    "GeoJson",
    "GeoPackage",
    "Geoprocessing Package",
    "Geoprocessing Sample",
    "Globe Document",
    "Image Collection",
    "Image",
    "iWork Keynote",
    "iWork Numbers",
    "iWork Pages",
    "KML Collection",
    "Layer Package",
    "Layer Template",
    "Layer",
    "Layout",
    "Locator Package",
    "Map Document",
    "Map Package",
    "Map Template",
    "Microsoft Excel",
    "Microsoft Powerpoint",
    "Microsoft Word",
    "Mobile Basemap Package",
    "Mobile Map Package",
    "Mobile Scene Package",
    "Native Application",
    "Native Application Installer",
    "Native Application Template",
    "netCDF",
    "Operation View",
    "Operations Dashboard Add In",
    "Operations Dashboard Extension",
    "PDF",
    "Pro Layer Package",
    "Pro Layer",
    "Pro Map Package",
    "Pro Map",
    "Pro Report",
    "Project Package",
    "Project Template",
    "Published Map",
    "Raster function template",
    "Report Template",
    "Rule Package",
    "Scene Document",
    "Scene Package",
    "Service Definition",
    "Shapefile",
    "Statistical Data Collection",
    "Style",
    "Survey123 Add In",
    "Symbol Set",
    "Task File",
    "Tile Package",
    "Toolbox Package",
    "Vector Tile Package",
    "Viewer Configuration",
    "Visio Document",
    "Window Mobile Package",
    "Windows Mobile Package",
    "Windows Viewer Add In",
    "Windows Viewer Configuration",
    "Workflow Manager Package",
];

/// Maps item type strings to their [`Handler`].
#[derive(Default)]
pub struct ProcessorRegistry {
    handlers: HashMap<String, Handler>,
}

impl ProcessorRegistry {
    /// An empty registry; every type is [`Handler::NotImplemented`].
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The registry with every built-in processor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("Group", Arc::new(GroupProcessor));
        let simple: Arc<dyn ItemProcessor> = Arc::new(SimpleProcessor);
        for item_type in SIMPLE_TYPES {
            registry.register(*item_type, simple.clone());
        }
        registry.register("Notebook", Arc::new(NotebookProcessor));
        registry.register("Workforce Project", Arc::new(WorkforceProcessor));
        let file: Arc<dyn ItemProcessor> = Arc::new(FileProcessor);
        for item_type in FILE_TYPES {
            registry.register(*item_type, file.clone());
        }
        for item_type in UNSUPPORTED_TYPES {
            registry.register_unsupported(*item_type);
        }
        registry
    }

    /// Registers a processor for a type, replacing any previous handler.
    pub fn register(&mut self, item_type: impl Into<String>, processor: Arc<dyn ItemProcessor>) {
        let item_type = item_type.into();
        debug!(item_type = %item_type, processor = processor.name(), "[REGISTRY] Registering item processor");
        self.handlers
            .insert(item_type, Handler::Processor(processor));
    }

    pub fn register_unsupported(&mut self, item_type: impl Into<String>) {
        self.handlers.insert(item_type.into(), Handler::Unsupported);
    }

    pub fn handler_for(&self, item_type: &str) -> Handler {
        self.handlers
            .get(item_type)
            .cloned()
            .unwrap_or(Handler::NotImplemented)
    }

    /// The processor for a type, or [`SolutionError::UnsupportedItemType`].
    pub fn processor_for(&self, item_type: &str) -> SolutionResult<Arc<dyn ItemProcessor>> {
        match self.handler_for(item_type) {
            Handler::Processor(processor) => Ok(processor),
            Handler::Unsupported => {
                warn!(item_type, "[REGISTRY] Item type is not supported");
                Err(SolutionError::UnsupportedItemType(item_type.to_string()))
            }
            Handler::NotImplemented => {
                warn!(item_type, "[REGISTRY] Item type has no processor");
                Err(SolutionError::UnsupportedItemType(item_type.to_string()))
            }
        }
    }

    pub fn contains(&self, item_type: &str) -> bool {
        self.handlers.contains_key(item_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("item_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
