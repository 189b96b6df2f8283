/// Folder name for a term's downloads: lowercased, spaces to underscores.
pub fn term_to_folder_name(term: &str) -> String {
    term.replace(' ', "_").to_lowercase()
}

/// File extension taken from the last dot-segment of a URL path. Falls back
/// to `jpg` when the URL carries no usable extension.
pub fn extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') && ext.len() <= 5 => {
            ext.to_string()
        }
        _ => "jpg".to_string(),
    }
}
