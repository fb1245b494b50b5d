use crate::models::{NewStudyItem, NewStudySet, SourceType};

pub const SAMPLE_SOURCE_NAME: &str = "sample-data";

fn choices(options: [&str; 4]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}

/// A small ready-made set so every study mode can be tried right away.
pub fn sample_study_set() -> NewStudySet {
    NewStudySet {
        title: "Cell Biology Basics".to_string(),
        description: "Core organelles and what they do".to_string(),
        items: vec![
            NewStudyItem::new("Mitochondria", "Produces energy for the cell through respiration")
                .with_choices(
                    choices([
                        "Stores genetic information",
                        "Produces energy for the cell through respiration",
                        "Synthesizes proteins",
                        "Packages proteins for export",
                    ]),
                    "B",
                ),
            NewStudyItem::new("Nucleus", "Holds the cell's genetic material").with_choices(
                choices([
                    "Holds the cell's genetic material",
                    "Breaks down waste",
                    "Controls what enters the cell",
                    "Captures light energy",
                ]),
                "A",
            ),
            NewStudyItem::new("Ribosome", "Builds proteins from amino acids").with_choices(
                choices([
                    "Stores water",
                    "Digests old organelles",
                    "Builds proteins from amino acids",
                    "Produces ATP",
                ]),
                "C",
            ),
            NewStudyItem::new("Golgi apparatus", "Modifies and packages proteins").with_choices(
                choices([
                    "Copies DNA",
                    "Generates heat",
                    "Anchors the cytoskeleton",
                    "Modifies and packages proteins",
                ]),
                "D",
            ),
            NewStudyItem::new("Lysosome", "Digests waste and worn-out cell parts").with_choices(
                choices([
                    "Digests waste and worn-out cell parts",
                    "Makes lipids",
                    "Stores starch",
                    "Pumps ions",
                ]),
                "A",
            ),
            NewStudyItem::new("Cell membrane", "Controls what enters and leaves the cell")
                .with_choices(
                    choices([
                        "Performs photosynthesis",
                        "Controls what enters and leaves the cell",
                        "Assembles ribosomes",
                        "Stores calcium",
                    ]),
                    "B",
                ),
        ],
        source_type: SourceType::Manual,
        source_name: Some(SAMPLE_SOURCE_NAME.to_string()),
    }
}
