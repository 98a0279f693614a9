use scraper::ElementRef;

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

pub fn extract_trimmed_text(node: ElementRef) -> String {
    extract_text(node).trim().to_string()
}

pub fn contains_all(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().all(|needle| haystack.contains(needle))
}
