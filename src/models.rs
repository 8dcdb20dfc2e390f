use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Genre codes as they appear in catalog files. Lookup is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Family,
    Fantasy,
    History,
    Horror,
    Music,
    Mystery,
    Romance,
    SciFiFantasy,
    TvMovie,
    Thriller,
    War,
    Western,
    ActionAdventure,
    Kids,
    News,
    Reality,
    Soap,
    Talk,
    WarPolitics,
    ScienceFiction,
}

impl Genre {
    pub const ALL: [Genre; 27] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Family,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Music,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFiFantasy,
        Genre::TvMovie,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
        Genre::ActionAdventure,
        Genre::Kids,
        Genre::News,
        Genre::Reality,
        Genre::Soap,
        Genre::Talk,
        Genre::WarPolitics,
        Genre::ScienceFiction,
    ];

    /// Returns `None` for anything that is not an exact genre code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Genre::Action => "ACTION",
            Genre::Adventure => "ADVENTURE",
            Genre::Animation => "ANIMATION",
            Genre::Comedy => "COMEDY",
            Genre::Crime => "CRIME",
            Genre::Documentary => "DOCUMENTARY",
            Genre::Drama => "DRAMA",
            Genre::Family => "FAMILY",
            Genre::Fantasy => "FANTASY",
            Genre::History => "HISTORY",
            Genre::Horror => "HORROR",
            Genre::Music => "MUSIC",
            Genre::Mystery => "MYSTERY",
            Genre::Romance => "ROMANCE",
            Genre::SciFiFantasy => "SCI_FI_FANTASY",
            Genre::TvMovie => "TV_MOVIE",
            Genre::Thriller => "THRILLER",
            Genre::War => "WAR",
            Genre::Western => "WESTERN",
            Genre::ActionAdventure => "ACTION_ADVENTURE",
            Genre::Kids => "KIDS",
            Genre::News => "NEWS",
            Genre::Reality => "REALITY",
            Genre::Soap => "SOAP",
            Genre::Talk => "TALK",
            Genre::WarPolitics => "WAR_POLITICS",
            Genre::ScienceFiction => "SCIENCE_FICTION",
        }
    }

    /// Human-facing name shown in the catalogue.
    pub fn label(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Family => "Family",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Horror => "Horror",
            Genre::Music => "Music",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFiFantasy => "Sci-Fi & Fantasy",
            Genre::TvMovie => "TV Movie",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
            Genre::ActionAdventure => "Action & Adventure",
            Genre::Kids => "Kids",
            Genre::News => "News",
            Genre::Reality => "Reality",
            Genre::Soap => "Soap",
            Genre::Talk => "Talk",
            Genre::WarPolitics => "War & Politics",
            Genre::ScienceFiction => "Science Fiction",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Movie,
    TvShow,
}

impl Category {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "MOVIE" => Some(Category::Movie),
            "TV_SHOW" => Some(Category::TvShow),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::Movie => "MOVIE",
            Category::TvShow => "TV_SHOW",
        }
    }

    /// Default category for a catalog file, judged by its name.
    pub fn infer_from_file_name(file_name: &str) -> Self {
        if file_name.contains("movie") {
            Category::Movie
        } else {
            Category::TvShow
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where a catalog entry came from. Bulk imports default to official data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    #[default]
    OfficialData,
    CustomData,
}

impl SourceType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "OFFICIAL_DATA" => Some(SourceType::OfficialData),
            "CUSTOM_DATA" => Some(SourceType::CustomData),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            SourceType::OfficialData => "OFFICIAL_DATA",
            SourceType::CustomData => "CUSTOM_DATA",
        }
    }
}

/// One catalog row after parsing. Only built with a non-empty title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRecord {
    pub title: String,
    pub other_title: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub genre: Option<Genre>,
    pub category: Category,
    pub source_type: SourceType,
    /// Always `None` for bulk-imported rows.
    pub creator_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_codes_round_trip_through_lookup() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_code(genre.code()), Some(genre));
        }
    }

    #[test]
    fn genre_lookup_is_case_sensitive() {
        assert_eq!(Genre::from_code("ACTION"), Some(Genre::Action));
        assert_eq!(Genre::from_code("Action"), None);
        assert_eq!(Genre::from_code("action"), None);
        assert_eq!(Genre::from_code(""), None);
    }

    #[test]
    fn genre_labels() {
        assert_eq!(Genre::SciFiFantasy.label(), "Sci-Fi & Fantasy");
        assert_eq!(Genre::WarPolitics.to_string(), "War & Politics");
    }

    #[test]
    fn category_from_code() {
        assert_eq!(Category::from_code("MOVIE"), Some(Category::Movie));
        assert_eq!(Category::from_code("TV_SHOW"), Some(Category::TvShow));
        assert_eq!(Category::from_code("tv show"), None);
    }

    #[test]
    fn category_inferred_from_file_name() {
        assert_eq!(Category::infer_from_file_name("movies.csv"), Category::Movie);
        assert_eq!(
            Category::infer_from_file_name("movies.csv.fixed"),
            Category::Movie
        );
        assert_eq!(
            Category::infer_from_file_name("tv_shows.csv"),
            Category::TvShow
        );
    }

    #[test]
    fn source_type_defaults_to_official() {
        assert_eq!(SourceType::default(), SourceType::OfficialData);
        assert_eq!(
            SourceType::from_code("CUSTOM_DATA"),
            Some(SourceType::CustomData)
        );
        assert_eq!(SourceType::from_code("USER"), None);
    }
}
