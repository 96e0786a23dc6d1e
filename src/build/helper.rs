//! Small shared pieces of the generated-text builders.

pub const TAB: &str = "    ";

/// Case convention for generated C identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamingConvention {
    UnderscoreUpperCase,
    UnderscoreLowerCase,
}

/// Turn an arbitrary document name into a C identifier.
///
/// Every character outside [a-zA-Z0-9_] becomes a separator, a camelCase
/// boundary splits the word, runs of separators collapse to a single
/// underscore, then the whole thing is forced to one case and prefixed.
/// Distinct input names can collide after this mapping; the asset
/// collector rejects such documents.
pub fn get_name(prefix: &str, name: &str, convention: NamingConvention) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut pending_separator = false;
    let mut previous_lowercase = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if previous_lowercase && ch.is_ascii_uppercase() {
                pending_separator = true;
            }
            if pending_separator && !sanitized.is_empty() {
                sanitized.push('_');
            }
            pending_separator = false;
            previous_lowercase = ch.is_ascii_lowercase();
            sanitized.push(ch);
        } else {
            pending_separator = true;
            previous_lowercase = false;
        }
    }

    let cased = match convention {
        NamingConvention::UnderscoreUpperCase => sanitized.to_ascii_uppercase(),
        NamingConvention::UnderscoreLowerCase => sanitized.to_ascii_lowercase(),
    };

    format!("{}{}", prefix, cased)
}

/// Render binary data as a C array body, 16 bytes per line.
pub fn dump_data(data: &[u8], out: &mut String) {
    for chunk in data.chunks(16) {
        out.push_str(TAB);
        for byte in chunk {
            out.push_str(&format!("0x{:02x}, ", byte));
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn names_are_sanitized_and_cased() {
        assert_eq!(
            get_name("PAGE_ID_", "Main Page", NamingConvention::UnderscoreUpperCase),
            "PAGE_ID_MAIN_PAGE"
        );
        assert_eq!(
            get_name("style_", "dialog - 2.0", NamingConvention::UnderscoreLowerCase),
            "style_dialog_2_0"
        );
    }

    #[test]
    fn camel_case_boundaries_split() {
        assert_eq!(
            get_name("BITMAP_ID_", "myBitmap", NamingConvention::UnderscoreUpperCase),
            "BITMAP_ID_MY_BITMAP"
        );
        assert_eq!(
            get_name("", "scrollBar left", NamingConvention::UnderscoreLowerCase),
            "scroll_bar_left"
        );
    }

    #[test]
    fn separator_runs_collapse() {
        assert_eq!(
            get_name("", "a--b  c", NamingConvention::UnderscoreLowerCase),
            "a_b_c"
        );
    }

    #[test]
    fn dump_wraps_at_sixteen_bytes() {
        let mut out = String::new();
        dump_data(&[0u8; 17], &mut out);
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with(TAB));
        assert!(out.contains("0x00, "));
    }
}
