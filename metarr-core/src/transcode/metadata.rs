//! Container metadata keys.
//!
//! Every container family spells the same logical tag differently. `MetaTag`
//! is the logical tag; `key_for` gives the container's spelling or `None`
//! when the container has no slot for it.

use crate::model::{CreditField, FileData};

/// Logical tags, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaTag {
    Title,
    Subtitle,
    Description,
    Synopsis,
    Comment,
    Date,
    CreationTime,
    Year,
    Artist,
    Composer,
    Director,
    Performer,
    Producer,
    Publisher,
    Genre,
    Show,
    EpisodeId,
    EpisodeSort,
    SeasonNumber,
    Language,
}

impl MetaTag {
    pub const ALL: [MetaTag; 20] = [
        MetaTag::Title,
        MetaTag::Subtitle,
        MetaTag::Description,
        MetaTag::Synopsis,
        MetaTag::Comment,
        MetaTag::Date,
        MetaTag::CreationTime,
        MetaTag::Year,
        MetaTag::Artist,
        MetaTag::Composer,
        MetaTag::Director,
        MetaTag::Performer,
        MetaTag::Producer,
        MetaTag::Publisher,
        MetaTag::Genre,
        MetaTag::Show,
        MetaTag::EpisodeId,
        MetaTag::EpisodeSort,
        MetaTag::SeasonNumber,
        MetaTag::Language,
    ];

    /// Tags compared against the probed container by the pre-check.
    pub const COMPARABLE: [MetaTag; 7] = [
        MetaTag::Title,
        MetaTag::Description,
        MetaTag::Synopsis,
        MetaTag::CreationTime,
        MetaTag::Date,
        MetaTag::Artist,
        MetaTag::Composer,
    ];

    /// The value this file intends to write, trimmed.
    pub fn value(self, file: &FileData) -> String {
        let raw = match self {
            MetaTag::Title => file.titles.title.as_str(),
            MetaTag::Subtitle => file.titles.subtitle.as_str(),
            MetaTag::Description => file.descriptions.description.as_str(),
            MetaTag::Synopsis => file.descriptions.synopsis.as_str(),
            MetaTag::Comment => file.descriptions.comment.as_str(),
            MetaTag::Date => file.dates.date.as_str(),
            MetaTag::CreationTime => file.dates.creation_time.as_str(),
            MetaTag::Year => file.dates.year.as_str(),
            MetaTag::Artist => return file.credits.display_value(CreditField::Artist),
            MetaTag::Composer => return file.credits.display_value(CreditField::Composer),
            MetaTag::Director => return file.credits.display_value(CreditField::Director),
            MetaTag::Performer => return file.credits.display_value(CreditField::Performer),
            MetaTag::Producer => return file.credits.display_value(CreditField::Producer),
            MetaTag::Publisher => return file.credits.display_value(CreditField::Publisher),
            MetaTag::Genre => file.other.genre.as_str(),
            MetaTag::Show => file.show.show.as_str(),
            MetaTag::EpisodeId => file.show.episode_id.as_str(),
            MetaTag::EpisodeSort => file.show.episode_sort.as_str(),
            MetaTag::SeasonNumber => file.show.season_number.as_str(),
            MetaTag::Language => file.other.language.as_str(),
        };
        raw.trim().to_string()
    }
}

/// Container families with their own tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    Matroska,
    Asf,
    Ogg,
    Avi,
    RealMedia,
    MpegTs,
}

impl Container {
    /// Family for a dotted lowercase extension. Unknown extensions use the
    /// MP4 vocabulary, which is what ffmpeg's generic muxers understand.
    pub fn from_ext(ext: &str) -> Self {
        match ext {
            ".mkv" | ".mka" | ".webm" => Self::Matroska,
            ".wmv" | ".asf" | ".wma" => Self::Asf,
            ".ogg" | ".ogv" | ".oga" | ".ogm" | ".opus" => Self::Ogg,
            ".avi" => Self::Avi,
            ".rm" | ".rmvb" => Self::RealMedia,
            ".ts" | ".m2ts" | ".mts" => Self::MpegTs,
            _ => Self::Mp4,
        }
    }

    pub fn key_for(self, tag: MetaTag) -> Option<&'static str> {
        use MetaTag as T;
        match self {
            Self::Mp4 => match tag {
                T::Title => Some("title"),
                T::Description => Some("description"),
                T::Synopsis => Some("synopsis"),
                T::Comment => Some("comment"),
                T::Date => Some("date"),
                T::CreationTime => Some("creation_time"),
                T::Year => Some("year"),
                T::Artist => Some("artist"),
                T::Composer => Some("composer"),
                T::Director => Some("director"),
                T::Producer => Some("producer"),
                T::Publisher => Some("publisher"),
                T::Genre => Some("genre"),
                T::Show => Some("show"),
                T::EpisodeId => Some("episode_id"),
                T::EpisodeSort => Some("episode_sort"),
                T::SeasonNumber => Some("season_number"),
                T::Language => Some("language"),
                T::Subtitle | T::Performer => None,
            },
            Self::Matroska => match tag {
                T::Title => Some("TITLE"),
                T::Subtitle => Some("SUBTITLE"),
                T::Description => Some("DESCRIPTION"),
                T::Synopsis => Some("SYNOPSIS"),
                T::Comment => Some("COMMENT"),
                T::Date => Some("DATE_RELEASED"),
                T::CreationTime => Some("DATE_ENCODED"),
                T::Artist => Some("ARTIST"),
                T::Composer => Some("COMPOSER"),
                T::Director => Some("DIRECTOR"),
                T::Performer => Some("LEAD_PERFORMER"),
                T::Producer => Some("PRODUCER"),
                T::Publisher => Some("PUBLISHER"),
                T::Genre => Some("GENRE"),
                T::EpisodeSort => Some("PART_NUMBER"),
                T::Language => Some("LANGUAGE"),
                T::Year | T::Show | T::EpisodeId | T::SeasonNumber => None,
            },
            Self::Asf => match tag {
                T::Title => Some("Title"),
                T::Subtitle => Some("WM/SubTitle"),
                T::Description => Some("Description"),
                T::Synopsis => Some("WM/SubTitleDescription"),
                T::Date => Some("WM/OriginalReleaseTime"),
                T::CreationTime => Some("WM/EncodingTime"),
                T::Year => Some("WM/Year"),
                T::Artist => Some("Author"),
                T::Composer => Some("WM/Composer"),
                T::Director => Some("WM/Director"),
                T::Producer => Some("WM/Producer"),
                T::Publisher => Some("WM/Publisher"),
                T::Genre => Some("WM/Genre"),
                T::Language => Some("WM/Language"),
                _ => None,
            },
            Self::Ogg => match tag {
                T::Title => Some("TITLE"),
                T::Subtitle => Some("SUBTITLE"),
                T::Description => Some("DESCRIPTION"),
                T::Comment => Some("COMMENT"),
                T::Date => Some("DATE"),
                T::Artist => Some("ARTIST"),
                T::Composer => Some("COMPOSER"),
                T::Performer => Some("PERFORMER"),
                T::Publisher => Some("ORGANIZATION"),
                T::Genre => Some("GENRE"),
                T::Language => Some("LANGUAGE"),
                _ => None,
            },
            Self::Avi => match tag {
                T::Title => Some("INAM"),
                T::Subtitle => Some("ISBJ"),
                T::Description => Some("COMM"),
                T::Comment => Some("ICMT"),
                T::Date => Some("ICRD"),
                T::Year => Some("YEAR"),
                T::Artist => Some("IART"),
                T::Director => Some("IENG"),
                T::Genre => Some("IGNR"),
                T::Language => Some("ILNG"),
                _ => None,
            },
            Self::RealMedia => match tag {
                T::Title => Some("Title"),
                T::Artist => Some("Author"),
                T::Comment => Some("Comment"),
                T::Description => Some("Description"),
                _ => None,
            },
            Self::MpegTs => match tag {
                T::Title => Some("service_name"),
                T::Artist => Some("service_provider"),
                _ => None,
            },
        }
    }
}

/// `(key, value)` pairs for every non-empty tag the container can hold.
pub fn metadata_pairs(file: &FileData, container: Container) -> Vec<(&'static str, String)> {
    MetaTag::ALL
        .iter()
        .filter_map(|tag| {
            let key = container.key_for(*tag)?;
            let value = tag.value(file);
            (!value.is_empty()).then_some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::tests::file_for;
    use std::path::Path;

    #[test]
    fn mkv_uses_matroska_names() {
        let mut file = file_for(Path::new("/j/clip.info.json"));
        file.titles.title = "Foo".to_string();
        file.credits.set(CreditField::Performer, "Ann");
        file.dates.year = "2021".to_string();

        let pairs = metadata_pairs(&file, Container::from_ext(".mkv"));
        assert_eq!(
            pairs,
            vec![("TITLE", "Foo".to_string()), ("LEAD_PERFORMER", "Ann".to_string())]
        );
    }

    #[test]
    fn lists_are_joined_and_values_trimmed() {
        let mut file = file_for(Path::new("/j/clip.info.json"));
        file.titles.title = "  Spaced  ".to_string();
        file.credits
            .set_list(CreditField::Artist, vec!["A".to_string(), "B".to_string()]);

        let pairs = metadata_pairs(&file, Container::Mp4);
        assert_eq!(pairs[0], ("title", "Spaced".to_string()));
        assert!(pairs.contains(&("artist", "A; B".to_string())));
    }

    #[test]
    fn containers_by_extension() {
        assert_eq!(Container::from_ext(".webm"), Container::Matroska);
        assert_eq!(Container::from_ext(".wmv"), Container::Asf);
        assert_eq!(Container::from_ext(".m4v"), Container::Mp4);
        assert_eq!(Container::Avi.key_for(MetaTag::Director), Some("IENG"));
        assert_eq!(Container::MpegTs.key_for(MetaTag::Artist), Some("service_provider"));
        assert_eq!(Container::Matroska.key_for(MetaTag::Year), None);
    }
}
