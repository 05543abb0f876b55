use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::models::SeedDescriptor;

/// Release window used when the seed's release year is unknown
const DEFAULT_PERIOD: (i32, i32) = (2015, 2024);

/// Words that never make a useful search keyword on their own
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "you", "your", "from", "feat", "featuring", "this", "that",
    "are", "was", "not", "but", "all", "remastered", "remaster", "version", "edit", "mix",
    "remix", "live", "radio", "mono", "stereo", "single", "original", "deluxe",
];

/// How a strategy turns a seed into a query string
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTemplate {
    /// `artist:"<contributor>"`
    Artist,
    /// `<contributor> <title>`
    ArtistAndTitle,
    /// `genre:<g1> OR <g2> ...`; declines when the seed has no genre tags
    Genres { max_tags: usize },
    /// Decade of the seed's release year as `year:<start>-<end>`
    ReleasePeriod,
    /// One keyword taken from the seed title; declines when none qualifies
    TitleKeyword,
    /// Same query for every seed
    Fixed(&'static str),
}

impl QueryTemplate {
    /// Builds the query for `seed`, or `None` when the template does not apply
    pub fn build(&self, seed: &SeedDescriptor, picker: &mut KeywordPicker) -> Option<String> {
        match self {
            QueryTemplate::Artist => Some(format!("artist:\"{}\"", seed.contributor)),
            QueryTemplate::ArtistAndTitle => Some(format!("{} {}", seed.contributor, seed.title)),
            QueryTemplate::Genres { max_tags } => {
                let tags: Vec<&str> = seed
                    .genres
                    .iter()
                    .map(|g| g.trim())
                    .filter(|g| !g.is_empty())
                    .take(*max_tags)
                    .collect();
                if tags.is_empty() {
                    None
                } else {
                    Some(format!("genre:{}", tags.join(" OR ")))
                }
            }
            QueryTemplate::ReleasePeriod => {
                let (start, end) = seed
                    .release_year
                    .map(decade_of)
                    .unwrap_or(DEFAULT_PERIOD);
                Some(format!("year:{}-{}", start, end))
            }
            QueryTemplate::TitleKeyword => picker.pick(&seed.title),
            QueryTemplate::Fixed(query) => Some((*query).to_string()),
        }
    }
}

fn decade_of(year: i32) -> (i32, i32) {
    let start = year - year.rem_euclid(10);
    (start, start + 9)
}

/// One stage of the per-seed search pipeline
#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: &'static str,
    pub template: QueryTemplate,
    /// Items requested from the search call
    pub cap: u32,
    /// Items this stage may contribute after filtering
    pub take: usize,
    /// Filter seed identifiers before `take` applies; otherwise a returned seed uses up
    /// a slot and is only dropped at assembly
    pub excludes_seed: bool,
}

impl Strategy {
    pub const fn new(
        name: &'static str,
        template: QueryTemplate,
        cap: u32,
        take: usize,
        excludes_seed: bool,
    ) -> Self {
        Self {
            name,
            template,
            cap,
            take,
            excludes_seed,
        }
    }

    /// Strategies in the order they run for every seed
    pub fn default_table() -> Vec<Strategy> {
        vec![
            Strategy::new("same_artist", QueryTemplate::Artist, 20, 6, true),
            Strategy::new("title_and_artist", QueryTemplate::ArtistAndTitle, 15, 4, true),
            Strategy::new("genre", QueryTemplate::Genres { max_tags: 2 }, 10, 3, true),
            Strategy::new("era", QueryTemplate::ReleasePeriod, 10, 3, true),
            Strategy::new("title_keyword", QueryTemplate::TitleKeyword, 10, 3, true),
            Strategy::new("long_tail", QueryTemplate::Fixed("tag:hipster"), 8, 2, true),
            Strategy::new("classics", QueryTemplate::Fixed("year:1990-2010"), 8, 2, true),
        ]
    }
}

/// Chooses the keyword for [`QueryTemplate::TitleKeyword`]
///
/// `Ranked` always picks the longest eligible word (earliest on ties). `Seeded` picks
/// uniformly from the eligible words with an explicit RNG, so a given seed value
/// reproduces the same choices.
#[derive(Debug, Clone, Default)]
pub enum KeywordPicker {
    #[default]
    Ranked,
    Seeded(StdRng),
}

impl KeywordPicker {
    pub fn seeded(seed: u64) -> Self {
        KeywordPicker::Seeded(StdRng::seed_from_u64(seed))
    }

    pub fn pick(&mut self, title: &str) -> Option<String> {
        let words = keywords(title);
        match self {
            KeywordPicker::Ranked => words
                .iter()
                .enumerate()
                .max_by(|(ia, a), (ib, b)| {
                    a.chars()
                        .count()
                        .cmp(&b.chars().count())
                        .then(ib.cmp(ia))
                })
                .map(|(_, word)| word.clone()),
            KeywordPicker::Seeded(rng) => words.choose(rng).cloned(),
        }
    }
}

/// Eligible keywords of a title, in order
///
/// Qualifiers after ` - ` and inside brackets ("Remastered 2011", "feat. X") are ignored.
fn keywords(title: &str) -> Vec<String> {
    let main = title.split(" - ").next().unwrap_or(title);

    let mut depth = 0usize;
    let unbracketed: String = main
        .chars()
        .map(|c| match c {
            '(' | '[' => {
                depth += 1;
                ' '
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                ' '
            }
            _ if depth > 0 => ' ',
            _ => c,
        })
        .collect();

    unbracketed
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= 3)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}
