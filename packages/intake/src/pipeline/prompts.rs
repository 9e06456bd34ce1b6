//! Prompts for the shipment extraction call.

/// System instruction sent with every extraction.
pub const SYSTEM_PROMPT: &str =
    "You are a precise data extraction assistant. Always return valid JSON.";

/// User instruction. `{content}` is replaced by the document text.
pub const EXTRACT_PROMPT: &str = r#"Extract shipment information from the document below.

Return a single JSON object with exactly these fields:
{
    "customer_name": "string (required) - full name of the recipient or customer",
    "address": "string (required) - complete delivery address",
    "tracking_id": "string or null - tracking or order reference",
    "delivery_date": "string or null - requested delivery date, formatted YYYY-MM-DD",
    "package_weight": "number or null - package weight in kilograms",
    "notes": "string or null - special delivery instructions or other remarks"
}

Use null for any optional field that is not present in the document.
Do not include any text, explanation, or markdown outside the JSON object.

Document:
{content}"#;

/// Build the user instruction for a document.
pub fn format_extract_prompt(content: &str) -> String {
    EXTRACT_PROMPT.replace("{content}", content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extract_prompt_embeds_document() {
        let prompt = format_extract_prompt("Ship to Jane Doe, 12 Oak St");
        assert!(prompt.ends_with("Ship to Jane Doe, 12 Oak St"));
        assert!(!prompt.contains("{content}"));
        for field in [
            "customer_name",
            "address",
            "tracking_id",
            "delivery_date",
            "package_weight",
            "notes",
        ] {
            assert!(prompt.contains(field), "prompt is missing {field}");
        }
    }

    #[test]
    fn test_document_braces_are_not_substituted() {
        let prompt = format_extract_prompt("{content} literally");
        assert!(prompt.ends_with("{content} literally"));
    }
}
