//! Tests for Block, BlockId and BlockType

#[cfg(test)]
mod tests {
    use crate::models::{Block, BlockDraft, BlockId, BlockMeta, BlockType};
    use serde_json::json;

    #[test]
    fn test_transient_ids_are_unique_and_tagged() {
        let a = BlockId::transient();
        let b = BlockId::transient();

        assert!(a.is_transient());
        assert!(a.as_str().starts_with("tmp-"));
        assert_ne!(a, b);
        assert!(!BlockId::new("981").is_transient());
    }

    #[test]
    fn test_block_type_round_trips_through_tag() {
        for block_type in BlockType::ALL {
            let parsed: BlockType = block_type.as_str().parse().unwrap();
            assert_eq!(parsed, block_type);
        }
        assert!("heading_4".parse::<BlockType>().is_err());
    }

    #[test]
    fn test_block_type_predicates() {
        assert!(BlockType::BulletList.is_continuable());
        assert!(BlockType::Todo.is_continuable());
        assert!(!BlockType::Paragraph.is_continuable());

        assert!(BlockType::Divider.is_non_editable());
        assert!(BlockType::Table.is_non_editable());
        assert!(BlockType::Code.is_text());

        assert_eq!(BlockType::Heading2.heading_level(), Some(2));
        assert_eq!(BlockType::Quote.heading_level(), None);
    }

    #[test]
    fn test_block_serializes_meta_as_string() {
        let mut block = Block::transient("doc-1", BlockType::Code, "fn main() {}", 1.0);
        block.meta.language = Some("rust".to_string());

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["block_type"], json!("code"));
        assert_eq!(value["meta_json"], json!("{\"language\":\"rust\"}"));
    }

    #[test]
    fn test_draft_copies_everything_but_id() {
        let mut block = Block::transient("doc-1", BlockType::Todo, "Call vendor", 4.5);
        block.indent_level = 1;
        block.meta.checked = Some(true);

        let draft = BlockDraft::from(&block);
        assert_eq!(draft.block_type, BlockType::Todo);
        assert_eq!(draft.content, "Call vendor");
        assert_eq!(draft.sort_order, 4.5);
        assert_eq!(draft.indent_level, 1);
        assert!(draft.meta.is_checked());

        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_is_empty_ignores_markup() {
        let mut block = Block::transient("doc-1", BlockType::Paragraph, "<br>", 1.0);
        assert!(block.is_empty());

        block.content = "&nbsp;".to_string();
        assert!(block.is_empty());

        block.content = "<b>hi</b>".to_string();
        assert!(!block.is_empty());
        assert_eq!(block.meta, BlockMeta::default());
    }
}
