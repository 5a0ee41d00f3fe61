pub mod artifacts;
pub mod catalog;
pub mod classifier;
pub mod error;
pub mod features;
pub mod training;

// Re-export commonly used types
pub use artifacts::{COLUMNS_FILE, MODEL_FILE, ModelArtifacts, Prediction};
pub use catalog::{Catalog, CategoricalColumn, Movie, MovieFilter, NumericColumn, Outcome, UNKNOWN};
pub use classifier::LogisticRegression;
pub use error::{QuizError, Result};
pub use features::{FeatureSchema, dummy_column, encode_movie};
pub use training::{TrainingConfig, TrainingReport, train, train_and_save};

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
id,title,budget,runtime,year,vote_average,vote_count,certification_US,genre,country,success
1,Hit One,50000000,120,2001,7.9,9000,PG-13,Action,USA,True
2,Flop One,80000000,95,2002,4.2,150,R,Horror,USA,False
3,Hit Two,30000000,110,2003,7.2,7000,PG,Action,UK,True
4,Flop Two,60000000,100,2004,4.8,300,R,Horror,UK,False
5,Hit Three,20000000,130,2005,8.1,12000,PG-13,Drama,USA,True
6,Flop Three,90000000,105,2006,5.0,200,,Horror,France,False
7,Hit Four,40000000,125,2007,6.9,6000,PG,Drama,UK,False
8,Flop Four,70000000,98,2008,5.5,900,R,Action,France,True
";

    #[test]
    fn test_trained_model_scores_catalog_movies() {
        let catalog = Catalog::from_reader(CSV.as_bytes()).unwrap();
        let (artifacts, _) = train(&catalog, &TrainingConfig::default()).unwrap();

        for movie in catalog.movies() {
            let prediction = artifacts.predict_movie(movie).unwrap();
            assert!((0.0..=1.0).contains(&prediction.hit_probability));
            match prediction.outcome {
                Outcome::Hit => assert!(prediction.hit_probability >= 0.5),
                Outcome::Flop => assert!(prediction.hit_probability <= 0.5),
            }
        }
    }

    #[test]
    fn test_prediction_survives_category_drift() {
        let catalog = Catalog::from_reader(CSV.as_bytes()).unwrap();
        let (artifacts, _) = train(&catalog, &TrainingConfig::default()).unwrap();

        let drifted = "\
id,title,budget,runtime,year,vote_average,vote_count,certification_US,genre,country,success
42,New Release,10000000,90,2024,6.0,50,NC-17,Western,Japan,True
";
        let fresh = Catalog::from_reader(drifted.as_bytes()).unwrap();
        let movie = fresh.get(42).unwrap();
        let row = artifacts.schema().encode(movie).unwrap();
        assert_eq!(row.len(), artifacts.schema().len());
        assert!(artifacts.predict_movie(movie).is_ok());
    }
}
