pub mod content_refresh;
pub mod design_refresh;

pub use content_refresh::{
    linked_content_query, ChartRef, ContentRefresher, RefreshError, SheetsEditor, SlideInfo,
    SlidesEditor,
};
pub use design_refresh::{DesignConfig, DesignEditor, DesignRefresher};
