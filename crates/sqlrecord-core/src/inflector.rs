//! Naming helpers: table names, class names and foreign keys.

use regex::Regex;
use std::sync::OnceLock;

/// Word transformations used to derive table, class and key names.
pub trait Inflector: Send + Sync {
    fn singularize(&self, word: &str) -> String;

    fn pluralize(&self, word: &str) -> String;

    /// `school_person` -> `schoolPerson`
    fn camelize(&self, word: &str) -> String {
        let mut out = String::with_capacity(word.len());
        let mut upper_next = false;
        for c in word.chars() {
            if c == '_' || c == '-' || c == ' ' {
                upper_next = !out.is_empty();
            } else if upper_next {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else if out.is_empty() {
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// `SchoolPerson` -> `school_person`
    fn underscore(&self, word: &str) -> String {
        let mut out = String::with_capacity(word.len() + 4);
        let mut prev_lower = false;
        for c in word.chars() {
            if c.is_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
                prev_lower = false;
            } else if c == '-' || c == ' ' {
                out.push('_');
                prev_lower = false;
            } else {
                out.push(c);
                prev_lower = c.is_alphanumeric();
            }
        }
        out
    }

    /// `people` -> `Person`
    fn classify(&self, word: &str) -> String {
        let camel = self.camelize(&self.singularize(&self.underscore(word)));
        let mut chars = camel.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => camel,
        }
    }

    /// `Person` -> `people`
    fn tableize(&self, class_name: &str) -> String {
        self.pluralize(&self.underscore(class_name))
    }

    /// `School` -> `school_id`
    fn keyify(&self, class_name: &str) -> String {
        let base = class_name.rsplit("::").next().unwrap_or(class_name);
        format!("{}_id", self.underscore(base))
    }

    /// `Some Name` -> `some_name`
    fn variablize(&self, name: &str) -> String {
        name.trim()
            .replace(['-', ' '], "_")
            .to_lowercase()
    }
}

const PLURALS: &[(&str, &str)] = &[
    ("(quiz)$", "${1}zes"),
    ("^(oxen)$", "${1}"),
    ("^(ox)$", "${1}en"),
    ("([ml])ice$", "${1}ice"),
    ("([ml])ouse$", "${1}ice"),
    ("(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
    ("(x|ch|ss|sh)$", "${1}es"),
    ("([^aeiouy]|qu)y$", "${1}ies"),
    ("(hive)$", "${1}s"),
    ("(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
    ("(shea|lea|loa|thie)f$", "${1}ves"),
    ("sis$", "ses"),
    ("([ti])a$", "${1}a"),
    ("([ti])um$", "${1}a"),
    ("(tomat|potat|ech|her|vet)o$", "${1}oes"),
    ("(bu)s$", "${1}ses"),
    ("(alias|status|campus)$", "${1}es"),
    ("(octop|vir)i$", "${1}i"),
    ("(octop|vir)us$", "${1}i"),
    ("(ax|test)is$", "${1}es"),
    ("s$", "s"),
    ("$", "s"),
];

const SINGULARS: &[(&str, &str)] = &[
    ("(database)s$", "${1}"),
    ("(quiz)zes$", "${1}"),
    ("(matr)ices$", "${1}ix"),
    ("(vert|ind)ices$", "${1}ex"),
    ("^(ox)en", "${1}"),
    ("(alias|status|campus)(es)?$", "${1}"),
    ("(octop|vir)(us|i)$", "${1}us"),
    ("(cris|ax|test)es$", "${1}is"),
    ("(shoe)s$", "${1}"),
    ("(o)es$", "${1}"),
    ("(bus)(es)?$", "${1}"),
    ("([ml])ice$", "${1}ouse"),
    ("(x|ch|ss|sh)es$", "${1}"),
    ("(m)ovies$", "${1}ovie"),
    ("(s)eries$", "${1}eries"),
    ("([^aeiouy]|qu)ies$", "${1}y"),
    ("([lr])ves$", "${1}f"),
    ("(tive)s$", "${1}"),
    ("(hive)s$", "${1}"),
    ("(li|wi|kni)ves$", "${1}fe"),
    ("(shea|loa|lea|thie)ves$", "${1}f"),
    ("(^analy)ses$", "${1}sis"),
    ("((a)naly|(b)a|(d)iagno|(p)arenthe|(p)rogno|(s)ynop|(t)he)ses$", "${1}sis"),
    ("([ti])a$", "${1}um"),
    ("(n)ews$", "${1}ews"),
    ("(h|bl)ouses$", "${1}ouse"),
    ("(corpse)s$", "${1}"),
    ("(us)es$", "${1}"),
    ("(ss)$", "${1}"),
    ("s$", ""),
];

const IRREGULARS: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("tooth", "teeth"),
];

const UNCOUNTABLE: &[&str] = &[
    "sheep",
    "fish",
    "deer",
    "series",
    "species",
    "money",
    "rice",
    "information",
    "equipment",
    "news",
    "police",
];

struct Rules {
    plurals: Vec<(Regex, &'static str)>,
    singulars: Vec<(Regex, &'static str)>,
}

fn compile(table: &'static [(&'static str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(&format!("(?i){pattern}"))
                .ok()
                .map(|re| (re, *replacement))
        })
        .collect()
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        plurals: compile(PLURALS),
        singulars: compile(SINGULARS),
    })
}

/// English inflection rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishInflector;

impl EnglishInflector {
    pub fn new() -> Self {
        Self
    }

    fn inflect(
        word: &str,
        table: &[(Regex, &'static str)],
        irregular: impl Fn(&str) -> Option<&'static str>,
    ) -> String {
        if word.is_empty() {
            return String::new();
        }
        // only the last segment of a compound name is inflected
        let split = word.rfind('_').map_or(0, |i| i + 1);
        let (head, last) = word.split_at(split);
        let lowered = last.to_lowercase();

        if UNCOUNTABLE.contains(&lowered.as_str()) {
            return word.to_string();
        }
        if let Some(replacement) = irregular(&lowered) {
            return format!("{head}{}", match_case(last, replacement));
        }
        for (re, replacement) in table {
            if re.is_match(last) {
                return format!("{head}{}", re.replace(last, *replacement));
            }
        }
        word.to_string()
    }
}

fn match_case(original: &str, replacement: &str) -> String {
    let mut chars = replacement.chars();
    match (original.chars().next(), chars.next()) {
        (Some(first), Some(r)) if first.is_uppercase() => r.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}

impl Inflector for EnglishInflector {
    fn singularize(&self, word: &str) -> String {
        Self::inflect(word, &rules().singulars, |lowered| {
            IRREGULARS
                .iter()
                .find(|(_, plural)| *plural == lowered)
                .map(|(singular, _)| *singular)
        })
    }

    fn pluralize(&self, word: &str) -> String {
        Self::inflect(word, &rules().plurals, |lowered| {
            IRREGULARS
                .iter()
                .find(|(singular, plural)| *singular == lowered || *plural == lowered)
                .map(|(_, plural)| *plural)
        })
    }
}
