// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

/// Generate a pool of source addresses for testing.
pub fn generate_sources(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = (i >> 16) & 0xFF;
            let b = (i >> 8) & 0xFF;
            let c = i & 0xFF;
            format!("10.{a}.{b}.{c}")
        })
        .collect()
}

/// Generate a pool of account identities for testing.
pub fn generate_identities(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("student-{i}@learn.example.com"))
        .collect()
}

/// Identity spellings that must all map to one tracking key.
pub fn identity_variants() -> Vec<&'static str> {
    vec![
        "student-0@learn.example.com",
        "Student-0@Learn.Example.COM",
        "  student-0@learn.example.com  ",
        "STUDENT-0@LEARN.EXAMPLE.COM",
    ]
}

/// Guarded endpoints a simulated caller cycles through.
pub fn generate_endpoints() -> Vec<&'static str> {
    vec![
        "/api/courses",
        "/api/quizzes/submit",
        "/api/wiki/pages",
        "/api/payments/checkout",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sources_unique() {
        let sources = generate_sources(256);
        assert_eq!(sources.len(), 256);
        let unique: std::collections::HashSet<_> = sources.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_identity_variants_normalize_to_one_key() {
        let keys: std::collections::HashSet<_> = identity_variants()
            .into_iter()
            .map(|v| abuse_guard::lockout::attempt_key("10.0.0.1", v))
            .collect();
        assert_eq!(keys.len(), 1);
    }
}
