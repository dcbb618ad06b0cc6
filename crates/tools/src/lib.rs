//! Tools Lectern exposes to the LLM.
//!
//! Both tools read the course index through [`CourseSearch`] and return
//! citations alongside their text output.

pub mod course_outline;
pub mod course_search;

use std::sync::Arc;
use lectern_core::index::CourseSearch;
use lectern_core::tool::ToolRegistry;

pub use course_outline::CourseOutlineTool;
pub use course_search::CourseSearchTool;

/// Registry with the content search and outline tools over `index`.
pub fn course_registry(index: Arc<dyn CourseSearch>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CourseSearchTool::new(index.clone())));
    registry.register(Box::new(CourseOutlineTool::new(index)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_index::{CourseIndex, HashingEmbedder, InMemoryStore};

    #[test]
    fn registry_exposes_both_tools() {
        let index = CourseIndex::new(Arc::new(InMemoryStore::new()), Arc::new(HashingEmbedder::default()));
        let registry = course_registry(Arc::new(index));
        assert_eq!(registry.names(), vec!["get_course_outline", "search_course_content"]);
        let defs = registry.definitions();
        assert_eq!(defs[1].parameters["required"][0], "query");
    }
}
