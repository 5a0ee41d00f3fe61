use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{QuizError, Result};

/// Placeholder stored in a categorical column when the CSV cell is missing
pub const UNKNOWN: &str = "Unknown";

const ID_COLUMN: &str = "id";
const TITLE_COLUMN: &str = "title";
const SUCCESS_COLUMN: &str = "success";

/// Categorical predictors, in the order their dummy columns are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoricalColumn {
    Certification,
    Genre,
    Country,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 3] = [
        CategoricalColumn::Certification,
        CategoricalColumn::Genre,
        CategoricalColumn::Country,
    ];

    /// Column name in the CSV header
    pub fn header(self) -> &'static str {
        match self {
            CategoricalColumn::Certification => "certification_US",
            CategoricalColumn::Genre => "genre",
            CategoricalColumn::Country => "country",
        }
    }
}

/// Numeric predictors, in feature-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    Budget,
    Runtime,
    Year,
    VoteAverage,
    VoteCount,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 5] = [
        NumericColumn::Budget,
        NumericColumn::Runtime,
        NumericColumn::Year,
        NumericColumn::VoteAverage,
        NumericColumn::VoteCount,
    ];

    pub fn header(self) -> &'static str {
        match self {
            NumericColumn::Budget => "budget",
            NumericColumn::Runtime => "runtime",
            NumericColumn::Year => "year",
            NumericColumn::VoteAverage => "vote_average",
            NumericColumn::VoteCount => "vote_count",
        }
    }
}

/// Box-office verdict, used both for ground truth and for model predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Hit,
    Flop,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Hit => "Hit",
            Outcome::Flop => "Flop",
        }
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success { Outcome::Hit } else { Outcome::Flop }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the movie catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub budget: Option<f64>,
    pub runtime: Option<f64>,
    pub year: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub certification: String,
    pub genre: String,
    pub country: String,
    pub success: Option<bool>,
}

impl Movie {
    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Budget => self.budget,
            NumericColumn::Runtime => self.runtime,
            NumericColumn::Year => self.year,
            NumericColumn::VoteAverage => self.vote_average,
            NumericColumn::VoteCount => self.vote_count,
        }
    }

    pub fn categorical(&self, column: CategoricalColumn) -> &str {
        match column {
            CategoricalColumn::Certification => &self.certification,
            CategoricalColumn::Genre => &self.genre,
            CategoricalColumn::Country => &self.country,
        }
    }

    /// Ground-truth verdict, if the row carries one
    pub fn outcome(&self) -> Option<Outcome> {
        self.success.map(Outcome::from)
    }
}

/// Equality filters for picking a movie. Empty values are treated as unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFilter {
    pub genre: Option<String>,
    pub country: Option<String>,
    pub certification: Option<String>,
}

impl MovieFilter {
    /// Build a filter from raw query pairs. A repeated key keeps its first value.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "genre" => &mut filter.genre,
                "country" => &mut filter.country,
                "certification" => &mut filter.certification,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        filter
    }

    fn predicates(&self) -> impl Iterator<Item = (CategoricalColumn, &str)> {
        [
            (CategoricalColumn::Genre, self.genre.as_deref()),
            (CategoricalColumn::Country, self.country.as_deref()),
            (CategoricalColumn::Certification, self.certification.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| match value {
            Some(v) if !v.is_empty() => Some((column, v)),
            _ => None,
        })
    }
}

/// Read-only in-memory movie table
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    movies: Vec<Movie>,
    by_id: HashMap<i64, usize>,
    categorical_columns: HashSet<CategoricalColumn>,
    numeric_columns: HashSet<NumericColumn>,
    has_success: bool,
    filled_unknown: HashMap<CategoricalColumn, usize>,
}

struct HeaderIndex {
    id: usize,
    title: Option<usize>,
    success: Option<usize>,
    categorical: Vec<(CategoricalColumn, usize)>,
    numeric: Vec<(NumericColumn, usize)>,
}

impl Catalog {
    /// Load the catalog from a CSV file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading movie catalog from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let index = Self::index_headers(&headers)?;

        let mut catalog = Catalog {
            categorical_columns: index.categorical.iter().map(|(c, _)| *c).collect(),
            numeric_columns: index.numeric.iter().map(|(c, _)| *c).collect(),
            has_success: index.success.is_some(),
            ..Default::default()
        };

        for column in CategoricalColumn::ALL {
            if !catalog.categorical_columns.contains(&column) {
                warn!(
                    "Filter column '{}' not found in catalog. Filtering by it will not work.",
                    column.header()
                );
            }
        }

        let mut skipped = 0usize;
        for record in csv_reader.records() {
            let record = record?;
            let cell = |idx: usize| record.get(idx).unwrap_or("");

            let Some(id) = parse_id(cell(index.id)) else {
                skipped += 1;
                continue;
            };

            let mut movie = Movie {
                id,
                title: index.title.map(|i| cell(i).to_string()).unwrap_or_default(),
                budget: None,
                runtime: None,
                year: None,
                vote_average: None,
                vote_count: None,
                certification: UNKNOWN.to_string(),
                genre: UNKNOWN.to_string(),
                country: UNKNOWN.to_string(),
                success: index.success.and_then(|i| parse_bool(cell(i))),
            };

            for &(column, idx) in &index.numeric {
                let value = parse_number(cell(idx));
                match column {
                    NumericColumn::Budget => movie.budget = value,
                    NumericColumn::Runtime => movie.runtime = value,
                    NumericColumn::Year => movie.year = value,
                    NumericColumn::VoteAverage => movie.vote_average = value,
                    NumericColumn::VoteCount => movie.vote_count = value,
                }
            }

            for &(column, idx) in &index.categorical {
                let raw = cell(idx);
                let value = if is_missing(raw) {
                    *catalog.filled_unknown.entry(column).or_default() += 1;
                    UNKNOWN.to_string()
                } else {
                    raw.to_string()
                };
                match column {
                    CategoricalColumn::Certification => movie.certification = value,
                    CategoricalColumn::Genre => movie.genre = value,
                    CategoricalColumn::Country => movie.country = value,
                }
            }

            let position = catalog.movies.len();
            catalog.by_id.entry(id).or_insert(position);
            catalog.movies.push(movie);
        }

        if skipped > 0 {
            warn!("Skipped {} catalog rows with an unparseable id", skipped);
        }
        info!("Loaded {} movies into the catalog", catalog.movies.len());

        Ok(catalog)
    }

    fn index_headers(headers: &csv::StringRecord) -> Result<HeaderIndex> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let id = position(ID_COLUMN).ok_or_else(|| QuizError::MissingColumn(ID_COLUMN.into()))?;

        Ok(HeaderIndex {
            id,
            title: position(TITLE_COLUMN),
            success: position(SUCCESS_COLUMN),
            categorical: CategoricalColumn::ALL
                .into_iter()
                .filter_map(|c| position(c.header()).map(|i| (c, i)))
                .collect(),
            numeric: NumericColumn::ALL
                .into_iter()
                .filter_map(|c| position(c.header()).map(|i| (c, i)))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn has_column(&self, column: CategoricalColumn) -> bool {
        self.categorical_columns.contains(&column)
    }

    pub fn has_numeric_column(&self, column: NumericColumn) -> bool {
        self.numeric_columns.contains(&column)
    }

    pub fn has_success_column(&self) -> bool {
        self.has_success
    }

    /// Number of cells in `column` that were missing and replaced by [`UNKNOWN`]
    pub fn filled_unknown(&self, column: CategoricalColumn) -> usize {
        self.filled_unknown.get(&column).copied().unwrap_or(0)
    }

    /// Header names of every predictor column the CSV lacks
    pub fn missing_predictors(&self) -> Vec<&'static str> {
        let numeric = NumericColumn::ALL
            .into_iter()
            .filter(|c| !self.has_numeric_column(*c))
            .map(NumericColumn::header);
        let categorical = CategoricalColumn::ALL
            .into_iter()
            .filter(|c| !self.has_column(*c))
            .map(CategoricalColumn::header);
        numeric.chain(categorical).collect()
    }

    /// First row with the given id
    pub fn get(&self, id: i64) -> Option<&Movie> {
        self.by_id.get(&id).map(|&i| &self.movies[i])
    }

    /// Sorted distinct values of a categorical column, without the sentinel or blanks.
    /// Empty when the column is not in the catalog.
    pub fn distinct_values(&self, column: CategoricalColumn) -> Vec<String> {
        if !self.has_column(column) {
            return Vec::new();
        }
        self.movies
            .iter()
            .map(|m| m.categorical(column))
            .filter(|v| !is_missing(v) && *v != UNKNOWN)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Rows matching every filter whose column exists in the catalog
    pub fn filter(&self, filter: &MovieFilter) -> Vec<&Movie> {
        let predicates: Vec<_> = filter
            .predicates()
            .filter(|(column, _)| self.has_column(*column))
            .collect();

        self.movies
            .iter()
            .filter(|movie| {
                predicates
                    .iter()
                    .all(|(column, value)| movie.categorical(*column) == *value)
            })
            .collect()
    }

    /// Uniformly sample one row from the filtered set
    pub fn random_pick<R: Rng + ?Sized>(&self, filter: &MovieFilter, rng: &mut R) -> Option<&Movie> {
        self.filter(filter).choose(rng).copied()
    }
}

fn is_missing(cell: &str) -> bool {
    matches!(
        cell.trim(),
        "" | "nan" | "NaN" | "NA" | "N/A" | "null" | "NULL" | "None"
    )
}

fn parse_id(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim() {
        "True" | "true" | "TRUE" | "1" | "1.0" => Some(true),
        "False" | "false" | "FALSE" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const CSV: &str = "\
id,title,budget,runtime,year,vote_average,vote_count,certification_US,genre,country,success
550,Fight Club,63000000,139,1999,8.4,26000,R,Drama,USA,True
13,Forrest Gump,55000000,142,1994,8.5,25000,PG-13,Drama,USA,True
99,Flop Movie,90000000,101,2003,4.1,300,,Action,UK,False
12,Finding Nemo,94000000,100,2003,7.8,18000,G,Animation,nan,True
abc,Broken Row,1,1,1,1,1,R,Drama,USA,True
";

    fn catalog() -> Catalog {
        Catalog::from_reader(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_load_normalizes_missing_categoricals() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);

        let flop = catalog.get(99).unwrap();
        assert_eq!(flop.certification, UNKNOWN);
        assert_eq!(flop.outcome(), Some(Outcome::Flop));

        let nemo = catalog.get(12).unwrap();
        assert_eq!(nemo.country, UNKNOWN);
        assert_eq!(catalog.filled_unknown(CategoricalColumn::Country), 1);
        assert_eq!(nemo.budget, Some(94_000_000.0));
    }

    #[test]
    fn test_distinct_values_are_sorted_and_clean() {
        let catalog = catalog();
        assert_eq!(
            catalog.distinct_values(CategoricalColumn::Genre),
            vec!["Action", "Animation", "Drama"]
        );
        assert_eq!(
            catalog.distinct_values(CategoricalColumn::Country),
            vec!["UK", "USA"]
        );
        assert_eq!(
            catalog.distinct_values(CategoricalColumn::Certification),
            vec!["G", "PG-13", "R"]
        );
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let catalog = catalog();
        let filter = MovieFilter {
            genre: Some("Drama".into()),
            country: Some("USA".into()),
            certification: Some("R".into()),
        };
        let matches = catalog.filter(&filter);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 550);

        let none = MovieFilter {
            genre: Some("Action".into()),
            country: Some("USA".into()),
            ..Default::default()
        };
        assert!(catalog.filter(&none).is_empty());
    }

    #[test]
    fn test_empty_filter_values_are_ignored() {
        let catalog = catalog();
        let filter = MovieFilter {
            genre: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(catalog.filter(&filter).len(), 4);
    }

    #[test]
    fn test_filters_on_absent_columns_are_ignored() {
        let csv = "id,title,genre\n1,A,Drama\n2,B,Comedy\n";
        let catalog = Catalog::from_reader(csv.as_bytes()).unwrap();
        assert!(!catalog.has_column(CategoricalColumn::Country));
        assert!(catalog.distinct_values(CategoricalColumn::Country).is_empty());

        let filter = MovieFilter {
            genre: Some("Drama".into()),
            country: Some("USA".into()),
            ..Default::default()
        };
        let matches = catalog.filter(&filter);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 1);
        assert_eq!(catalog.missing_predictors().len(), 7);
    }

    #[test]
    fn test_random_pick_respects_filters() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(7);
        let filter = MovieFilter {
            genre: Some("Drama".into()),
            ..Default::default()
        };
        for _ in 0..20 {
            let movie = catalog.random_pick(&filter, &mut rng).unwrap();
            assert_eq!(movie.genre, "Drama");
        }

        let impossible = MovieFilter {
            country: Some("France".into()),
            ..Default::default()
        };
        assert!(catalog.random_pick(&impossible, &mut rng).is_none());
    }

    #[test]
    fn test_filter_from_query_pairs_keeps_first_value() {
        let filter = MovieFilter::from_query_pairs([
            ("genre", "Comedy"),
            ("genre", "Drama"),
            ("page", "2"),
            ("country", "France"),
        ]);
        assert_eq!(filter.genre.as_deref(), Some("Comedy"));
        assert_eq!(filter.country.as_deref(), Some("France"));
        assert_eq!(filter.certification, None);
    }

    #[test]
    fn test_missing_id_column_is_an_error() {
        let err = Catalog::from_reader("title,genre\nA,Drama\n".as_bytes()).unwrap_err();
        assert!(matches!(err, QuizError::MissingColumn(c) if c == "id"));
    }

    #[test]
    fn test_float_ids_are_accepted() {
        assert_eq!(parse_id("550.0"), Some(550));
        assert_eq!(parse_id("550.5"), None);
        assert_eq!(parse_bool("1.0"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }
}
