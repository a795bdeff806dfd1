use serde::{Deserialize, Serialize};

/// Top-level response of `GET volumes`. The API omits `items` entirely when nothing matches.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesResponse {
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub items: Option<Vec<Volume>>,
}

/// A single search result. Only `id` and `volume_info.title` are guaranteed to be present.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    pub volume_info: VolumeInfo,
    #[serde(default)]
    pub sale_info: Option<SaleInfo>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: String,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub image_links: Option<ImageLinks>,
    pub page_count: Option<u32>,
    pub print_type: Option<String>,
    pub categories: Option<Vec<String>>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u32>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    /// Free-form, may be a year, a year and month or a full date
    pub published_date: Option<String>,
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
}

/// An ISBN or other catalog identifier, e.g. `{"type": "ISBN_13", "identifier": "9780441013593"}`
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleInfo {
    pub is_ebook: bool,
    pub saleability: Option<String>,
    pub list_price: Option<Price>,
    pub retail_price: Option<Price>,
    pub buy_link: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    pub amount: Option<f64>,
    pub currency_code: Option<String>,
}

impl Volume {
    /// A volume carrying nothing but its ID and title
    #[inline]
    #[must_use]
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            volume_info: VolumeInfo {
                title,
                ..VolumeInfo::default()
            },
            sale_info: None,
        }
    }

    /// Authors as a single display string, `None` if the API lists none
    #[inline]
    #[must_use]
    pub fn authors_display(&self) -> Option<String> {
        self.volume_info
            .authors
            .as_ref()
            .filter(|authors| !authors.is_empty())
            .map(|authors| authors.join(", "))
    }

    /// The thumbnail URL, upgraded to HTTPS. The API still hands out plain `http:` links.
    #[inline]
    #[must_use]
    pub fn secure_thumbnail(&self) -> Option<String> {
        self.volume_info
            .image_links
            .as_ref()
            .and_then(|links| links.thumbnail.as_ref().or(links.small_thumbnail.as_ref()))
            .map(|url| url.replacen("http:", "https:", 1))
    }

    /// The ISBN-13 if present, otherwise the ISBN-10
    #[inline]
    #[must_use]
    pub fn isbn(&self) -> Option<&str> {
        let identifiers = self.volume_info.industry_identifiers.as_deref()?;
        ["ISBN_13", "ISBN_10"].iter().find_map(|wanted| {
            identifiers
                .iter()
                .find(|identifier| identifier.kind == *wanted)
                .map(|identifier| identifier.identifier.as_str())
        })
    }
}

/// Decodes a `GET volumes` response body into its list of volumes.
/// # Errors
/// Fails if the body is not a valid volumes response
#[inline]
pub fn parse_volumes(body: &str) -> Result<Vec<Volume>, serde_json::Error> {
    let response: VolumesResponse = serde_json::from_str(body)?;
    Ok(response.items.unwrap_or_default())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DUNE_RESPONSE: &str = r#"{
        "kind": "books#volumes",
        "totalItems": 2,
        "items": [
            {
                "kind": "books#volume",
                "id": "B1hSG45JCX4C",
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "publisher": "Penguin",
                    "publishedDate": "2003",
                    "description": "Set on the desert planet Arrakis...",
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "0441013597"},
                        {"type": "ISBN_13", "identifier": "9780441013593"}
                    ],
                    "pageCount": 528,
                    "printType": "BOOK",
                    "categories": ["Fiction"],
                    "averageRating": 4.5,
                    "ratingsCount": 87,
                    "imageLinks": {
                        "smallThumbnail": "http://books.google.com/small.jpg",
                        "thumbnail": "http://books.google.com/thumb.jpg"
                    },
                    "language": "en"
                },
                "saleInfo": {
                    "country": "JP",
                    "saleability": "FOR_SALE",
                    "isEbook": true,
                    "listPrice": {"amount": 1200.0, "currencyCode": "JPY"},
                    "buyLink": "https://play.google.com/store/books/details?id=B1hSG45JCX4C"
                }
            },
            {
                "id": "bare",
                "volumeInfo": {"title": "Dune Companion"}
            }
        ]
    }"#;

    #[test]
    fn parses_full_and_sparse_volumes() {
        let volumes = parse_volumes(DUNE_RESPONSE).unwrap();
        assert_eq!(volumes.len(), 2);

        let dune = &volumes[0];
        assert_eq!(dune.id, "B1hSG45JCX4C");
        assert_eq!(dune.volume_info.page_count, Some(528));
        assert_eq!(dune.authors_display().as_deref(), Some("Frank Herbert"));
        assert_eq!(
            dune.secure_thumbnail().as_deref(),
            Some("https://books.google.com/thumb.jpg")
        );
        assert_eq!(dune.isbn(), Some("9780441013593"));
        let sale = dune.sale_info.as_ref().unwrap();
        assert!(sale.is_ebook);
        assert_eq!(
            sale.list_price.as_ref().unwrap().currency_code.as_deref(),
            Some("JPY")
        );

        let bare = &volumes[1];
        assert_eq!(bare.volume_info.title, "Dune Companion");
        assert_eq!(bare.authors_display(), None);
        assert_eq!(bare.secure_thumbnail(), None);
        assert_eq!(bare.isbn(), None);
        assert_eq!(bare.sale_info, None);
    }

    #[test]
    fn missing_items_means_no_results() {
        let volumes = parse_volumes(r#"{"kind": "books#volumes", "totalItems": 0}"#).unwrap();
        assert!(volumes.is_empty());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_volumes("<html>quota exceeded</html>").is_err());
        assert!(parse_volumes(r#"{"items": [{"volumeInfo": {"title": "no id"}}]}"#).is_err());
    }
}
