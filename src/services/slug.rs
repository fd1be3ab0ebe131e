//! URL slugs for posts, categories, divisions and departments

use std::future::Future;

/// Longest slug we generate or accept
pub const MAX_SLUG_LEN: usize = 80;

/// Lowercase ASCII slug: alphanumerics kept, everything else folded into
/// single hyphens, no leading or trailing hyphen.
pub fn generate_slug(text: &str) -> String {
    let mut result = String::new();
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if result.len() > MAX_SLUG_LEN {
        result.truncate(MAX_SLUG_LEN);
        while result.ends_with('-') {
            result.pop();
        }
    }
    result
}

/// Whether `slug` is already in canonical form
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= MAX_SLUG_LEN && generate_slug(slug) == slug
}

/// First free slug among `base`, `base-2`, `base-3`, ...
pub async fn unique_slug<F, Fut>(base: &str, mut exists: F) -> anyhow::Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    if !exists(base.to_string()).await? {
        return Ok(base.to_string());
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn fold_accent(c: char) -> Vec<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        'ß' => return vec!['s', 's'],
        'æ' | 'Æ' => return vec!['a', 'e'],
        '&' => return vec![' ', 'a', 'n', 'd', ' '],
        other => other,
    };
    vec![folded]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Kiny -- Media!  "), "kiny-media");
        assert_eq!(generate_slug("Café & Crème"), "cafe-and-creme");
        assert_eq!(generate_slug("2024 Annual Report"), "2024-annual-report");
        assert_eq!(generate_slug("日本語"), "");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("kiny-media"));
        assert!(!is_valid_slug("Kiny Media"));
        assert!(!is_valid_slug("-kiny"));
        assert!(!is_valid_slug(""));
    }

    #[tokio::test]
    async fn test_unique_slug_appends_counter() {
        let taken = ["news".to_string(), "news-2".to_string()];
        let slug = unique_slug("news", |s| {
            let hit = taken.contains(&s);
            async move { Ok(hit) }
        })
        .await
        .unwrap();
        assert_eq!(slug, "news-3");

        let free = unique_slug("fresh", |_| async { Ok(false) }).await.unwrap();
        assert_eq!(free, "fresh");
    }

    proptest! {
        #[test]
        fn prop_generated_slugs_are_canonical(text in ".{0,120}") {
            let slug = generate_slug(&text);
            prop_assert!(slug.len() <= MAX_SLUG_LEN);
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert_eq!(generate_slug(&slug), slug);
        }
    }
}
