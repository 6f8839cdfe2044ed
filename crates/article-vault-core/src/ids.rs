//! Record identifiers of the form `<prefix>_<unix-millis>_<suffix>`.
//!
//! The suffix is the first nine hex characters of a v4 UUID, so uniqueness is
//! probabilistic. Collisions on write are not detected.

use chrono::Utc;
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;

/// Generate a fresh identifier with the given prefix (e.g. `"article"`).
pub fn generate(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        &suffix[..SUFFIX_LEN]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let id = generate("article");
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "article");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn test_generate_differs() {
        assert_ne!(generate("user"), generate("user"));
    }
}
