//! The three quiz operations, independent of HTTP plumbing.

use hitflop_core::{CategoricalColumn, MovieFilter, Outcome};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::models::{FilterOptions, GuessResponse, QuizMovie, SubmitGuessRequest};
use crate::poster::PosterSource;
use crate::state::QuizContext;

const TMDB_PREFIX: &str = "tmdb-";

pub fn filter_options(context: &QuizContext) -> Result<FilterOptions, ApiError> {
    let catalog = context.catalog()?;
    Ok(FilterOptions {
        genres: catalog.distinct_values(CategoricalColumn::Genre),
        countries: catalog.distinct_values(CategoricalColumn::Country),
        certifications: catalog.distinct_values(CategoricalColumn::Certification),
    })
}

pub async fn next_movie(
    context: &QuizContext,
    filter: &MovieFilter,
    posters: &dyn PosterSource,
) -> Result<QuizMovie, ApiError> {
    let catalog = context.catalog()?;

    let picked = catalog
        .random_pick(filter, &mut rand::rng())
        .map(|m| (m.id, m.title.clone()));
    let Some((movie_id, title)) = picked else {
        info!(?filter, "No movies match the requested filters");
        return Err(ApiError::NotFound(
            "No movies found matching your criteria. Try broadening your filters!".into(),
        ));
    };

    let poster_url = posters.poster_path(movie_id).await.into_option();

    Ok(QuizMovie {
        id: movie_id.to_string(),
        title,
        poster_url,
    })
}

/// Accepts both `tmdb-<n>` and bare `<n>` identifiers
pub fn parse_movie_id(raw: &str) -> Option<i64> {
    raw.replace(TMDB_PREFIX, "")
        .trim()
        .parse()
        .ok()
        .or_else(|| raw.trim().parse().ok())
}

pub fn submit_guess(
    context: &QuizContext,
    request: SubmitGuessRequest,
) -> Result<GuessResponse, ApiError> {
    let not_loaded =
        || ApiError::DataUnavailable("Backend model or data not properly loaded".into());
    let artifacts = context.artifacts().ok_or_else(not_loaded)?;
    let catalog = context.catalog().map_err(|_| not_loaded())?;

    let (movie_id_raw, user_guess) = match (request.movie_id, request.guess) {
        (Some(id), Some(guess)) if !id.is_empty() && !guess.is_empty() => (id, guess),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing movieId or guess in request".into(),
            ));
        }
    };

    let movie_id = parse_movie_id(&movie_id_raw)
        .ok_or_else(|| ApiError::BadRequest("Invalid movieId format".into()))?;

    let movie = catalog.get(movie_id).ok_or_else(|| {
        ApiError::NotFound(format!("Movie with ID {} not found in local DB", movie_id))
    })?;

    for column in catalog.missing_predictors() {
        warn!(
            movie_id,
            "Predictor column '{}' missing from catalog. Prediction might be affected.", column
        );
    }

    let processing =
        || ApiError::Processing("Error processing movie features for prediction".into());
    let prediction = artifacts.predict_movie(movie).map_err(|e| {
        error!(movie_id, "Error during encoding/alignment: {}", e);
        processing()
    })?;
    let actual = movie.outcome().ok_or_else(|| {
        error!(movie_id, "Movie has no stored success label");
        processing()
    })?;

    let is_correct = user_guess == actual.as_str();
    let feedback_message = feedback_message(
        &user_guess,
        is_correct,
        actual,
        prediction.outcome,
        prediction.confidence_percent(),
    );

    info!(
        movie_id,
        guess = %user_guess,
        actual = %actual,
        predicted = %prediction.outcome,
        is_correct,
        "Scored guess"
    );

    Ok(GuessResponse {
        movie_id: movie_id_raw,
        user_guess,
        prediction: prediction.outcome.to_string(),
        actual_result: actual.to_string(),
        is_correct,
        feedback_message,
    })
}

fn feedback_message(
    guess: &str,
    is_correct: bool,
    actual: Outcome,
    predicted: Outcome,
    hit_confidence: u32,
) -> String {
    let verdict = if is_correct {
        format!("Correct! It was indeed a {}.", actual)
    } else {
        format!("Not quite! It was actually a {}.", actual)
    };
    format!(
        "You guessed {}. {} (Model predicted: {} with {}% confidence for Hit)",
        guess, verdict, predicted, hit_confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, CATALOG_CSV, FixedPoster};
    use hitflop_core::{Catalog, TrainingConfig, train};

    fn context() -> QuizContext {
        test_support::trained_context()
    }

    fn guess(id: &str, guess: &str) -> SubmitGuessRequest {
        SubmitGuessRequest {
            movie_id: Some(id.into()),
            guess: Some(guess.into()),
        }
    }

    #[test]
    fn test_parse_movie_id_formats() {
        assert_eq!(parse_movie_id("tmdb-550"), Some(550));
        assert_eq!(parse_movie_id("550"), Some(550));
        assert_eq!(parse_movie_id(" 42 "), Some(42));
        assert_eq!(parse_movie_id("tmdb-abc"), None);
        assert_eq!(parse_movie_id("imdb-550"), None);
    }

    #[test]
    fn test_filter_options() {
        let options = filter_options(&context()).unwrap();
        assert_eq!(options.genres, vec!["Action", "Animation", "Comedy", "Drama"]);
        assert_eq!(options.countries, vec!["France", "USA"]);
        assert_eq!(options.certifications, vec!["G", "PG", "PG-13", "R"]);
    }

    #[tokio::test]
    async fn test_next_movie_matches_filters() {
        let context = context();
        let filter = MovieFilter {
            genre: Some("Comedy".into()),
            country: Some("France".into()),
            certification: None,
        };
        let movie = next_movie(&context, &filter, &FixedPoster).await.unwrap();
        assert_eq!(movie.id, "30");
        assert_eq!(movie.title, "Amelie");
        assert_eq!(movie.poster_url.as_deref(), Some("/30.jpg"));
    }

    #[tokio::test]
    async fn test_next_movie_without_match_is_not_found() {
        let filter = MovieFilter {
            genre: Some("Western".into()),
            ..Default::default()
        };
        let err = next_movie(&context(), &filter, &FixedPoster)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(msg) if msg.contains("broadening")));
    }

    #[test]
    fn test_wrong_guess_on_flop() {
        let response = submit_guess(&context(), guess("99", "Hit")).unwrap();
        assert_eq!(response.actual_result, "Flop");
        assert!(!response.is_correct);
        assert!(
            response
                .feedback_message
                .starts_with("You guessed Hit. Not quite! It was actually a Flop.")
        );
        assert!(response.feedback_message.contains("confidence for Hit)"));
    }

    #[test]
    fn test_correct_guess_with_prefixed_id() {
        let response = submit_guess(&context(), guess("tmdb-550", "Hit")).unwrap();
        assert_eq!(response.movie_id, "tmdb-550");
        assert_eq!(response.actual_result, "Hit");
        assert!(response.is_correct);
        assert!(response.feedback_message.contains("Correct! It was indeed a Hit."));
    }

    #[test]
    fn test_guess_comparison_is_case_sensitive() {
        let response = submit_guess(&context(), guess("550", "hit")).unwrap();
        assert!(!response.is_correct);
    }

    #[test]
    fn test_actual_result_is_stable() {
        let context = context();
        let first = submit_guess(&context, guess("12", "Flop")).unwrap();
        let second = submit_guess(&context, guess("12", "Hit")).unwrap();
        assert_eq!(first.actual_result, second.actual_result);
        assert_eq!(first.prediction, second.prediction);
    }

    #[test]
    fn test_unknown_movie_is_not_found() {
        for g in ["Hit", "Flop", "whatever"] {
            let err = submit_guess(&context(), guess("123456", g)).unwrap_err();
            assert!(matches!(err, ApiError::NotFound(_)));
        }
    }

    #[test]
    fn test_bad_requests() {
        let context = context();
        let missing = SubmitGuessRequest {
            movie_id: Some("550".into()),
            guess: None,
        };
        assert!(matches!(
            submit_guess(&context, missing),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            submit_guess(&context, guess("", "Hit")),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            submit_guess(&context, guess("fight-club", "Hit")),
            Err(ApiError::BadRequest(msg)) if msg == "Invalid movieId format"
        ));
    }

    #[test]
    fn test_model_missing_is_data_unavailable() {
        let catalog = Catalog::from_reader(CATALOG_CSV.as_bytes()).unwrap();
        let context = QuizContext::new(Some(catalog), None);
        assert!(matches!(
            submit_guess(&context, guess("550", "Hit")),
            Err(ApiError::DataUnavailable(_))
        ));
        assert!(filter_options(&context).is_ok());
    }

    #[test]
    fn test_missing_numeric_value_is_processing_error() {
        let catalog = Catalog::from_reader(CATALOG_CSV.as_bytes()).unwrap();
        let (artifacts, _) = train(&catalog, &TrainingConfig::default()).unwrap();
        let broken = Catalog::from_reader(
            "id,title,budget,runtime,year,vote_average,vote_count,certification_US,genre,country,success\n\
             5,No Budget,,90,2000,6.0,100,R,Drama,USA,True\n"
                .as_bytes(),
        )
        .unwrap();
        let context = QuizContext::new(Some(broken), Some(artifacts));
        assert!(matches!(
            submit_guess(&context, guess("5", "Hit")),
            Err(ApiError::Processing(_))
        ));
    }

    fn context_with_catalog(csv: &str) -> QuizContext {
        let trained = test_support::trained_context();
        let catalog = Catalog::from_reader(csv.as_bytes()).unwrap();
        QuizContext::new(Some(catalog), trained.artifacts().cloned())
    }

    #[test]
    fn test_absent_categorical_column_still_scores() {
        let context = context_with_catalog(
            "id,title,budget,runtime,year,vote_average,vote_count,certification_US,genre,success\n\
             550,Fight Club,63000000,139,1999,8.4,26000,R,Drama,True\n",
        );
        let catalog = context.catalog().unwrap();
        assert_eq!(catalog.missing_predictors(), vec!["country"]);
        assert_eq!(catalog.get(550).unwrap().country, "Unknown");

        let response = submit_guess(&context, guess("550", "Hit")).unwrap();
        assert_eq!(response.actual_result, "Hit");
        assert!(response.is_correct);
        assert!(response.feedback_message.starts_with("You guessed Hit. Correct!"));
    }

    #[test]
    fn test_absent_numeric_column_is_processing_error() {
        let context = context_with_catalog(
            "id,title,runtime,year,vote_average,vote_count,certification_US,genre,country,success\n\
             550,Fight Club,139,1999,8.4,26000,R,Drama,USA,True\n",
        );
        assert!(matches!(
            submit_guess(&context, guess("550", "Hit")),
            Err(ApiError::Processing(msg)) if msg == "Error processing movie features for prediction"
        ));
    }

    #[test]
    fn test_feedback_message_format() {
        assert_eq!(
            feedback_message("Flop", true, Outcome::Flop, Outcome::Hit, 73),
            "You guessed Flop. Correct! It was indeed a Flop. (Model predicted: Hit with 73% confidence for Hit)"
        );
    }
}
