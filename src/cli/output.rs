//! Output formatting utilities

use crate::domain::comparison::ComparisonModel;
use crate::domain::tag::Tag;

/// Format a document's tag list for display
pub fn format_tag_list(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "No tags found".to_string();
    }

    let mut output = String::new();
    for tag in tags {
        output.push_str(&format!(
            "{:<8} {:<6} @{:<6} {}\n",
            tag.tag_type(),
            if tag.id().is_empty() { "-" } else { tag.id() },
            tag.position(),
            tag.text()
        ));
    }
    output
}

/// Format a comparison session summary for display
pub fn format_comparison_summary(model: &ComparisonModel) -> String {
    if model.unit_count() == 0 {
        return "No differing sentences\n".to_string();
    }

    let mut output = format!("{} differing sentence(s)\n", model.unit_count());
    let raw = &model.comparison_sentences()[0];
    for (index, sentence) in raw.iter().enumerate() {
        let marker = if model.adopted_flags()[index] {
            "[adopted]"
        } else {
            "[open]   "
        };
        output.push_str(&format!("{:>3} {} {}\n", index, marker, sentence));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn test_format_empty_tag_list() {
        assert_eq!(format_tag_list(&[]), "No tags found");
    }

    #[test]
    fn test_format_tag_list() {
        let mut attributes = IndexMap::new();
        attributes.insert("id".to_string(), "t1".to_string());
        let tag = Tag::new("TIMEX3", attributes, 3, "Friday", "tid", IndexMap::new());

        let output = format_tag_list(&[tag]);
        assert!(output.contains("TIMEX3"));
        assert!(output.contains("t1"));
        assert!(output.contains("@3"));
        assert!(output.contains("Friday"));
    }

    #[test]
    fn test_format_empty_comparison() {
        let model = ComparisonModel::new();
        assert_eq!(format_comparison_summary(&model), "No differing sentences\n");
    }
}
