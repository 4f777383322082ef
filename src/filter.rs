//! Smart playlist rules and their compilation to a Plex filter query.
//!
//! A rule is `(field, comparator, value)`. Compilation turns a rule list
//! into the query fragment Plex evaluates for smart playlists:
//!
//! - ALL: `artist.title=Daft%20Punk&year>>=2000`
//! - ANY: `push=1&artist.title=Daft%20Punk&or=1&genre=House&pop=1`
//!
//! Operator tokens follow the Plex filter grammar (`=`, `!=`, `==`, `!==`,
//! `<=`, `>=`, `>>=`, `<<=`). Dates are relative day counts (`-30d`) and
//! star ratings are rescaled to the server's 0-10 range.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Fields and Comparators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Date,
}

impl FieldType {
    pub fn comparators(self) -> &'static [Comparator] {
        use Comparator::*;
        match self {
            FieldType::Text => &[
                Contains,
                DoesNotContain,
                ExactMatch,
                NotExactMatch,
                BeginsWith,
                EndsWith,
            ],
            FieldType::Integer => &[Equals, NotEquals, GreaterOrEqual, LessOrEqual],
            FieldType::Date => &[InTheLast, NotInTheLast],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Artist,
    Album,
    Title,
    Genre,
    Year,
    Rating,
    PlayCount,
    DateAdded,
    LastPlayed,
}

impl RuleField {
    pub const ALL: [RuleField; 9] = [
        RuleField::Artist,
        RuleField::Album,
        RuleField::Title,
        RuleField::Genre,
        RuleField::Year,
        RuleField::Rating,
        RuleField::PlayCount,
        RuleField::DateAdded,
        RuleField::LastPlayed,
    ];

    /// Key of the attribute in the Plex filter grammar.
    pub fn remote_key(self) -> &'static str {
        match self {
            RuleField::Artist => "artist.title",
            RuleField::Album => "album.title",
            RuleField::Title => "title",
            RuleField::Genre => "genre",
            RuleField::Year => "year",
            RuleField::Rating => "userRating",
            RuleField::PlayCount => "viewCount",
            RuleField::DateAdded => "addedAt",
            RuleField::LastPlayed => "lastViewedAt",
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            RuleField::Artist | RuleField::Album | RuleField::Title | RuleField::Genre => {
                FieldType::Text
            }
            RuleField::Year | RuleField::Rating | RuleField::PlayCount => FieldType::Integer,
            RuleField::DateAdded | RuleField::LastPlayed => FieldType::Date,
        }
    }

    pub fn available_comparators(self) -> &'static [Comparator] {
        self.field_type().comparators()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RuleField::Artist => "Artist",
            RuleField::Album => "Album",
            RuleField::Title => "Title",
            RuleField::Genre => "Genre",
            RuleField::Year => "Year",
            RuleField::Rating => "Rating",
            RuleField::PlayCount => "Play Count",
            RuleField::DateAdded => "Date Added",
            RuleField::LastPlayed => "Last Played",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            RuleField::Artist => "artist",
            RuleField::Album => "album",
            RuleField::Title => "title",
            RuleField::Genre => "genre",
            RuleField::Year => "year",
            RuleField::Rating => "rating",
            RuleField::PlayCount => "playCount",
            RuleField::DateAdded => "dateAdded",
            RuleField::LastPlayed => "lastPlayed",
        }
    }
}

impl FromStr for RuleField {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_', ' '], "").to_lowercase();
        RuleField::ALL
            .into_iter()
            .find(|f| f.slug().to_lowercase() == wanted)
            .ok_or_else(|| RuleParseError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Contains,
    DoesNotContain,
    ExactMatch,
    NotExactMatch,
    BeginsWith,
    EndsWith,
    Equals,
    NotEquals,
    GreaterOrEqual,
    LessOrEqual,
    InTheLast,
    NotInTheLast,
}

impl Comparator {
    pub const ALL: [Comparator; 12] = [
        Comparator::Contains,
        Comparator::DoesNotContain,
        Comparator::ExactMatch,
        Comparator::NotExactMatch,
        Comparator::BeginsWith,
        Comparator::EndsWith,
        Comparator::Equals,
        Comparator::NotEquals,
        Comparator::GreaterOrEqual,
        Comparator::LessOrEqual,
        Comparator::InTheLast,
        Comparator::NotInTheLast,
    ];

    /// Operator token in the Plex filter grammar.
    pub fn remote_operator(self) -> &'static str {
        match self {
            Comparator::Contains | Comparator::Equals => "=",
            Comparator::DoesNotContain | Comparator::NotEquals => "!=",
            Comparator::ExactMatch => "==",
            Comparator::NotExactMatch => "!==",
            Comparator::BeginsWith => "<=",
            Comparator::EndsWith => ">=",
            Comparator::GreaterOrEqual | Comparator::InTheLast => ">>=",
            Comparator::LessOrEqual | Comparator::NotInTheLast => "<<=",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Comparator::Contains => "contains",
            Comparator::DoesNotContain => "does not contain",
            Comparator::ExactMatch => "is exactly",
            Comparator::NotExactMatch => "is not exactly",
            Comparator::BeginsWith => "begins with",
            Comparator::EndsWith => "ends with",
            Comparator::Equals => "is",
            Comparator::NotEquals => "is not",
            Comparator::GreaterOrEqual => "is greater than or equal to",
            Comparator::LessOrEqual => "is less than or equal to",
            Comparator::InTheLast => "is in the last",
            Comparator::NotInTheLast => "is not in the last",
        }
    }

    /// Short name used on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            Comparator::Contains => "contains",
            Comparator::DoesNotContain => "not-contains",
            Comparator::ExactMatch => "is",
            Comparator::NotExactMatch => "is-not",
            Comparator::BeginsWith => "begins-with",
            Comparator::EndsWith => "ends-with",
            Comparator::Equals => "eq",
            Comparator::NotEquals => "ne",
            Comparator::GreaterOrEqual => "gte",
            Comparator::LessOrEqual => "lte",
            Comparator::InTheLast => "in-last",
            Comparator::NotInTheLast => "not-in-last",
        }
    }
}

impl FromStr for Comparator {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Comparator::ALL
            .into_iter()
            .find(|c| c.slug() == wanted)
            .ok_or_else(|| RuleParseError::UnknownComparator(s.to_string()))
    }
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("Rule '{0}' must look like field:comparator:value")]
    Syntax(String),

    #[error("Unknown rule field '{0}'")]
    UnknownField(String),

    #[error("Unknown comparator '{0}'")]
    UnknownComparator(String),

    #[error("'{comparator}' cannot be used with {field}")]
    IllegalComparator {
        field: &'static str,
        comparator: &'static str,
    },

    #[error("Unknown match mode '{0}' (expected all or any)")]
    UnknownMode(String),

    #[error("Unknown sort '{0}'")]
    UnknownSort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub field: RuleField,
    pub comparator: Comparator,
    pub value: String,
}

impl Rule {
    /// Build a rule, rejecting comparators the field does not support.
    pub fn new(
        field: RuleField,
        comparator: Comparator,
        value: &str,
    ) -> Result<Self, RuleParseError> {
        let rule = Self {
            field,
            comparator,
            value: value.to_string(),
        };
        if !rule.is_legal() {
            return Err(RuleParseError::IllegalComparator {
                field: field.display_name(),
                comparator: comparator.display_name(),
            });
        }
        Ok(rule)
    }

    pub fn is_legal(&self) -> bool {
        self.field.available_comparators().contains(&self.comparator)
    }
}

impl FromStr for Rule {
    type Err = RuleParseError;

    /// Parse `field:comparator:value`; the value may itself contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(field), Some(comparator), Some(value)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(RuleParseError::Syntax(s.to_string()));
        };
        Rule::new(field.parse()?, comparator.parse()?, value)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.field.display_name(),
            self.comparator.display_name(),
            self.value
        )?;
        if self.field.field_type() == FieldType::Date {
            write!(f, " days")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

impl FromStr for MatchMode {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(MatchMode::All),
            "any" => Ok(MatchMode::Any),
            _ => Err(RuleParseError::UnknownMode(s.to_string())),
        }
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// Highest value treated as a star count rather than a 0-10 rating.
const MAX_STARS: u32 = 5;

fn encode_value(field: RuleField, value: &str) -> String {
    let remote = match field.field_type() {
        FieldType::Date => format!("-{}d", value),
        _ if field == RuleField::Rating => match value.parse::<u32>() {
            Ok(stars) if stars <= MAX_STARS => (stars * 2).to_string(),
            _ => value.to_string(),
        },
        _ => value.to_string(),
    };
    urlencoding::encode(&remote).into_owned()
}

fn compile_rule(rule: &Rule) -> Option<String> {
    debug_assert!(rule.is_legal(), "illegal comparator for field: {:?}", rule);
    let value = rule.value.trim();
    if value.is_empty() {
        return None;
    }
    Some(format!(
        "{}{}{}",
        rule.field.remote_key(),
        rule.comparator.remote_operator(),
        encode_value(rule.field, value)
    ))
}

/// Compile rules into a Plex filter query. Rules with blank values are
/// skipped; no surviving rules gives an empty string (all tracks).
/// Clause order follows rule order.
///
/// Targets the Plex Media Server advanced filter syntax as sent by the
/// Plex web client and python-plexapi (`_buildAdvancedFilter`): clauses
/// are `&`-joined (AND), and an OR group is bracketed by `push=1` and
/// `pop=1` with `or=1` placed *between* its alternatives, e.g.
/// `push=1&genre=Rock&or=1&genre=Jazz&pop=1`. A leading `or=1` right
/// after `push=1` would leave the server without a left operand.
pub fn compile(rules: &[Rule], mode: MatchMode) -> String {
    let clauses: Vec<String> = rules.iter().filter_map(compile_rule).collect();

    match mode {
        MatchMode::Any if clauses.len() > 1 => format!("push=1&{}&pop=1", clauses.join("&or=1&")),
        _ => clauses.join("&"),
    }
}

// ============================================================================
// Smart Playlists
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOption {
    Random,
    MostPlayed,
    LeastPlayed,
    RecentlyAdded,
    HighestRated,
}

impl SortOption {
    pub fn plex_sort(self) -> &'static str {
        match self {
            SortOption::Random => "random",
            SortOption::MostPlayed => "viewCount:desc",
            SortOption::LeastPlayed => "viewCount:asc",
            SortOption::RecentlyAdded => "addedAt:desc",
            SortOption::HighestRated => "userRating:desc",
        }
    }
}

impl FromStr for SortOption {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "random" => Ok(SortOption::Random),
            "most-played" => Ok(SortOption::MostPlayed),
            "least-played" => Ok(SortOption::LeastPlayed),
            "recently-added" => Ok(SortOption::RecentlyAdded),
            "highest-rated" => Ok(SortOption::HighestRated),
            _ => Err(RuleParseError::UnknownSort(s.to_string())),
        }
    }
}

/// Everything needed to create or update a smart playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartPlaylist {
    pub title: String,
    pub rules: Vec<Rule>,
    pub mode: MatchMode,
    pub limit: Option<u32>,
    pub sort: Option<SortOption>,
}

impl SmartPlaylist {
    pub fn filter(&self) -> String {
        compile(&self.rules, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(field: RuleField, comparator: Comparator, value: &str) -> Rule {
        Rule::new(field, comparator, value).unwrap()
    }

    #[test]
    fn test_empty_rules() {
        assert_eq!(compile(&[], MatchMode::All), "");
        assert_eq!(compile(&[], MatchMode::Any), "");
    }

    #[test]
    fn test_blank_values_dropped() {
        let rules = [rule(RuleField::Artist, Comparator::Contains, "")];
        assert_eq!(compile(&rules, MatchMode::All), "");

        let rules = [
            rule(RuleField::Artist, Comparator::Contains, "   "),
            rule(RuleField::Genre, Comparator::ExactMatch, "House"),
        ];
        // One survivor never gets the OR wrapper
        assert_eq!(compile(&rules, MatchMode::Any), "genre==House");
    }

    #[test]
    fn test_rating_rescaled() {
        let rules = [rule(RuleField::Rating, Comparator::Equals, "4")];
        assert_eq!(compile(&rules, MatchMode::All), "userRating=8");

        let rules = [rule(RuleField::Rating, Comparator::GreaterOrEqual, "8")];
        assert_eq!(compile(&rules, MatchMode::All), "userRating>>=8");

        let rules = [rule(RuleField::Rating, Comparator::LessOrEqual, "2.5")];
        assert_eq!(compile(&rules, MatchMode::All), "userRating<<=2.5");
    }

    #[test]
    fn test_date_relative() {
        let rules = [rule(RuleField::DateAdded, Comparator::InTheLast, "30")];
        assert_eq!(compile(&rules, MatchMode::All), "addedAt>>=-30d");

        let rules = [rule(RuleField::LastPlayed, Comparator::NotInTheLast, " 7 ")];
        assert_eq!(compile(&rules, MatchMode::All), "lastViewedAt<<=-7d");
    }

    #[test]
    fn test_values_percent_encoded() {
        let rules = [rule(RuleField::Artist, Comparator::Contains, "Simon & Garfunkel")];
        assert_eq!(compile(&rules, MatchMode::All), "artist.title=Simon%20%26%20Garfunkel");
    }

    #[test]
    fn test_all_mode() {
        let rules = [
            rule(RuleField::Artist, Comparator::Contains, "Daft Punk"),
            rule(RuleField::Year, Comparator::GreaterOrEqual, "2000"),
            rule(RuleField::Title, Comparator::BeginsWith, "One"),
        ];
        assert_eq!(
            compile(&rules, MatchMode::All),
            "artist.title=Daft%20Punk&year>>=2000&title<=One"
        );
    }

    #[test]
    fn test_any_mode_grouped() {
        let rules = [
            rule(RuleField::Artist, Comparator::Contains, "Daft Punk"),
            rule(RuleField::Genre, Comparator::DoesNotContain, "Rock"),
            rule(RuleField::PlayCount, Comparator::Equals, "0"),
        ];
        assert_eq!(
            compile(&rules, MatchMode::Any),
            "push=1&artist.title=Daft%20Punk&or=1&genre!=Rock&or=1&viewCount=0&pop=1"
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let rules = [
            rule(RuleField::Album, Comparator::EndsWith, "Live"),
            rule(RuleField::Album, Comparator::NotExactMatch, "Greatest Hits"),
        ];
        for mode in [MatchMode::All, MatchMode::Any] {
            assert_eq!(compile(&rules, mode), compile(&rules, mode));
        }
        assert_eq!(
            compile(&rules, MatchMode::All),
            "album.title>=Live&album.title!==Greatest%20Hits"
        );
    }

    #[test]
    fn test_legality() {
        for field in RuleField::ALL {
            for comparator in Comparator::ALL {
                let legal = field.available_comparators().contains(&comparator);
                assert_eq!(Rule::new(field, comparator, "1").is_ok(), legal);
            }
        }
        assert!(Rule::new(RuleField::Year, Comparator::Contains, "19").is_err());
    }

    #[test]
    fn test_parse_rule() {
        let r: Rule = "artist:contains:Daft Punk".parse().unwrap();
        assert_eq!(r, rule(RuleField::Artist, Comparator::Contains, "Daft Punk"));

        let r: Rule = "title:is:Time: The Donut".parse().unwrap();
        assert_eq!(r.value, "Time: The Donut");

        let r: Rule = "date-added:in-last:30".parse().unwrap();
        assert_eq!(r.field, RuleField::DateAdded);
        assert_eq!(r.to_string(), "Date Added is in the last 30 days");

        assert_eq!("artist".parse::<Rule>(), Err(RuleParseError::Syntax("artist".to_string())));
        assert!(matches!("bpm:eq:120".parse::<Rule>(), Err(RuleParseError::UnknownField(_))));
        assert!(matches!(
            "year:contains:19".parse::<Rule>(),
            Err(RuleParseError::IllegalComparator { .. })
        ));
    }

    #[test]
    fn test_sort_and_mode() {
        assert_eq!("most-played".parse::<SortOption>().unwrap().plex_sort(), "viewCount:desc");
        assert_eq!("highest_rated".parse::<SortOption>().unwrap().plex_sort(), "userRating:desc");
        assert_eq!("ANY".parse::<MatchMode>(), Ok(MatchMode::Any));
        assert!("some".parse::<MatchMode>().is_err());
    }

    #[test]
    fn test_smart_playlist_filter() {
        let smart = SmartPlaylist {
            title: "Fresh".to_string(),
            rules: vec![rule(RuleField::DateAdded, Comparator::InTheLast, "14")],
            mode: MatchMode::All,
            limit: Some(50),
            sort: Some(SortOption::RecentlyAdded),
        };
        assert_eq!(smart.filter(), "addedAt>>=-14d");
    }
}
