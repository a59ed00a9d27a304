//! Rendering of partitions into file-name patterns for test runners.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SplitConfig;
use crate::partition::Partition;

/// A split expressed as file patterns, ready for a test runner filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSplit {
    pub includes: bool,
    pub list: Vec<String>,
}

impl fmt::Display for RenderedSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "includes={} list=[{}]", self.includes, self.list.join(", "))
    }
}

/// File names for one class: its dotted path as a directory path, once per
/// extension (`org.acme.FooTest` -> `org/acme/FooTest.java`, ...).
pub fn class_patterns(class: &str, extensions: &[String]) -> Vec<String> {
    let path = class.replace('.', "/");
    extensions.iter().map(|ext| format!("{path}{ext}")).collect()
}

fn expand<'a>(classes: impl IntoIterator<Item = &'a str>, extensions: &[String]) -> Vec<String> {
    classes
        .into_iter()
        .flat_map(|c| class_patterns(c, extensions))
        .collect()
}

/// Render a partition.
///
/// With `generate_inclusions`, the splits are rendered as computed: one
/// exclusion split followed by inclusion splits. Without it, every split is
/// rendered as an exclusion of all known classes outside its own bucket, for
/// runners that only support exclude filters.
pub fn render(partition: &Partition, config: &SplitConfig, generate_inclusions: bool) -> Vec<RenderedSplit> {
    let extensions = &config.file_extensions;

    if generate_inclusions {
        return partition
            .splits()
            .into_iter()
            .map(|split| RenderedSplit {
                includes: split.includes,
                list: expand(split.list.iter().map(String::as_str), extensions),
            })
            .collect();
    }

    partition
        .buckets()
        .iter()
        .map(|own| {
            let mine: HashSet<&str> = own.classes.iter().map(String::as_str).collect();
            let others = partition.known_classes().filter(|c| !mine.contains(c));
            RenderedSplit {
                includes: false,
                list: expand(others, extensions),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Durations, ParallelismMode};
    use std::time::Duration;

    fn partition_of(entries: &[(&str, u64)], groups: usize) -> Partition {
        let durations: Durations = entries
            .iter()
            .map(|(n, ms)| (n.to_string(), Duration::from_millis(*ms)))
            .collect();
        Partition::compute(&durations, ParallelismMode::Count(groups))
    }

    #[test]
    fn dotted_names_become_paths() {
        let exts = SplitConfig::default().file_extensions;
        assert_eq!(
            class_patterns("org.acme.FooTest", &exts),
            vec!["org/acme/FooTest.java", "org/acme/FooTest.class"]
        );
        assert_eq!(class_patterns("two", &exts), vec!["two.java", "two.class"]);
    }

    #[test]
    fn inclusions_render_both_variants() {
        let p = partition_of(&[("one", 10), ("two", 20)], 2);
        let rendered = render(&p, &SplitConfig::default(), true);
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].to_string(), "includes=false list=[two.java, two.class]");
        assert_eq!(rendered[1].to_string(), "includes=true list=[two.java, two.class]");
    }

    #[test]
    fn no_data_renders_empty_exclusion() {
        let p = Partition::compute(&Durations::new(), ParallelismMode::Count(2));
        for generate_inclusions in [true, false] {
            let rendered = render(&p, &SplitConfig::default(), generate_inclusions);
            assert_eq!(rendered.len(), 1);
            assert_eq!(rendered[0].to_string(), "includes=false list=[]");
        }
    }

    #[test]
    fn exclusion_only_rendering_excludes_other_buckets() {
        let p = partition_of(&[("a", 9), ("b", 5), ("c", 4)], 3);
        let rendered = render(&p, &SplitConfig::default(), false);
        assert_eq!(rendered.len(), 3);
        assert!(rendered.iter().all(|r| !r.includes));

        // First split is identical in both modes.
        let with_inclusions = render(&p, &SplitConfig::default(), true);
        assert_eq!(rendered[0], with_inclusions[0]);

        // Each other split excludes exactly the classes it does not own.
        for (bucket, r) in p.buckets().iter().zip(&rendered) {
            for class in p.known_classes() {
                let pattern = format!("{class}.java");
                let owned = bucket.classes.iter().any(|c| c == class);
                assert_eq!(r.list.contains(&pattern), !owned, "{class} in {r}");
            }
        }
    }

    #[test]
    fn custom_extensions() {
        let p = partition_of(&[("m::one", 1), ("m::two", 2)], 2);
        let config = SplitConfig {
            file_extensions: vec![".rs".to_string()],
            ..SplitConfig::default()
        };
        let rendered = render(&p, &config, true);
        assert_eq!(rendered[1].list, vec!["m::two.rs"]);
    }
}
