use async_trait::async_trait;
use hitflop_core::{Catalog, TrainingConfig, train};

use crate::poster::{PosterLookup, PosterSource};
use crate::state::QuizContext;

pub const CATALOG_CSV: &str = "\
id,title,budget,runtime,year,vote_average,vote_count,certification_US,genre,country,success
550,Fight Club,63000000,139,1999,8.4,26000,R,Drama,USA,True
13,Forrest Gump,55000000,142,1994,8.5,25000,PG-13,Drama,USA,True
99,Gigli,54000000,121,2003,3.5,300,R,Comedy,USA,False
101,Cutthroat Island,98000000,124,1995,5.7,500,PG-13,Action,USA,False
12,Finding Nemo,94000000,100,2003,7.8,18000,G,Animation,USA,True
77,Mars Needs Moms,150000000,88,2011,5.6,400,PG,Animation,USA,False
30,Amelie,10000000,122,2001,7.9,9000,R,Comedy,France,True
31,Babylon AD,70000000,101,2008,5.2,900,PG-13,Action,France,False
";

/// Poster source that answers `/<id>.jpg` without touching the network
pub struct FixedPoster;

#[async_trait]
impl PosterSource for FixedPoster {
    async fn poster_path(&self, movie_id: i64) -> PosterLookup {
        PosterLookup::Found(format!("/{}.jpg", movie_id))
    }
}

pub struct NoPoster;

#[async_trait]
impl PosterSource for NoPoster {
    async fn poster_path(&self, _movie_id: i64) -> PosterLookup {
        PosterLookup::Unavailable
    }
}

pub fn catalog() -> Catalog {
    Catalog::from_reader(CATALOG_CSV.as_bytes()).expect("fixture catalog parses")
}

/// Catalog plus a model trained on it
pub fn trained_context() -> QuizContext {
    let catalog = catalog();
    let (artifacts, _) = train(&catalog, &TrainingConfig::default()).expect("fixture trains");
    QuizContext::new(Some(catalog), Some(artifacts))
}
