//! Shapes of data crossing API boundary and their conversions to and from entities.
//!
//! Field names follow the established client contract.

use axum::extract::{FromRequest, Multipart, Request};
use cinedb_dal::{
    actor::{Actor, CreateActor},
    genre::{CreateGenre, Genre},
};
use cinedb_store::UploadedFile;
use cinedb_types::validation::{first_letter_uppercase, not_blank};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const MAX_GENRE_NAME_CHARS: usize = 50;
pub const MAX_ACTOR_NAME_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreDto {
    pub id: i64,
    pub nombre: String,
}

impl From<Genre> for GenreDto {
    fn from(value: Genre) -> Self {
        Self {
            id: value.id,
            nombre: value.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGenreDto {
    #[serde(default, alias = "Nombre")]
    #[garde(
        custom(not_blank),
        length(chars, max = 50),
        custom(first_letter_uppercase)
    )]
    pub nombre: String,
}

impl From<CreateGenreDto> for CreateGenre {
    fn from(value: CreateGenreDto) -> Self {
        Self {
            name: value.nombre.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorDto {
    pub id: i64,
    pub nombre: String,
    pub fecha_nacimiento: Date,
    pub foto: Option<String>,
}

impl From<Actor> for ActorDto {
    fn from(value: Actor) -> Self {
        Self {
            id: value.id,
            nombre: value.name,
            fecha_nacimiento: value.birth_date,
            foto: value.photo,
        }
    }
}

/// Multipart form for creating or replacing an actor
#[derive(Debug, Default, Validate)]
pub struct ActorForm {
    #[garde(custom(not_blank), length(chars, max = 200))]
    pub nombre: String,
    #[garde(required)]
    pub fecha_nacimiento: Option<Date>,
    #[garde(skip)]
    pub foto: Option<UploadedFile>,
}

impl ActorForm {
    /// Entity payload with given photo URL
    pub fn to_entity(&self, photo: Option<String>) -> ApiResult<CreateActor> {
        let birth_date = self
            .fecha_nacimiento
            .ok_or_else(|| ApiError::InvalidRequest("Missing birth date".into()))?;
        Ok(CreateActor {
            name: self.nombre.trim().to_string(),
            birth_date,
            photo,
        })
    }

    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = ActorForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_lowercase();
            match name.as_str() {
                "nombre" => form.nombre = field.text().await?,
                "fechanacimiento" => {
                    let value = field.text().await?;
                    form.fecha_nacimiento = parse_birth_date(&value)?;
                }
                "foto" => {
                    let file_name = field.file_name().unwrap_or("foto").to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    if data.is_empty() {
                        debug!("Empty photo field ignored");
                    } else {
                        form.foto = Some(UploadedFile::new(file_name, content_type, data));
                    }
                }
                other => debug!("Ignoring unknown form field {other}"),
            }
        }
        Ok(form)
    }
}

impl FromRequest<AppState> for ActorForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        let form = ActorForm::from_multipart(multipart).await?;
        form.validate()?;
        Ok(form)
    }
}

/// Accepts `YYYY-MM-DD`, time part of ISO datetime is ignored, blank is no date
pub fn parse_birth_date(value: &str) -> ApiResult<Option<Date>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let date_part = match value.char_indices().nth(10) {
        Some((idx, 'T' | ' ')) => &value[..idx],
        _ => value,
    };
    Date::parse(date_part, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid birth date {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn test_create_genre_validation() {
        let ok: CreateGenreDto = serde_json::from_str(r#"{"nombre": "Drama"}"#).unwrap();
        assert!(ok.validate().is_ok());

        let alias: CreateGenreDto = serde_json::from_str(r#"{"Nombre": "Drama"}"#).unwrap();
        assert_eq!(alias.nombre, "Drama");

        let lower: CreateGenreDto = serde_json::from_str(r#"{"nombre": "drama"}"#).unwrap();
        assert!(lower.validate().is_err());

        let missing: CreateGenreDto = serde_json::from_str("{}").unwrap();
        assert!(missing.validate().is_err());

        let long = CreateGenreDto {
            nombre: format!("D{}", "a".repeat(MAX_GENRE_NAME_CHARS)),
        };
        assert!(long.validate().is_err());

        let accented = CreateGenreDto {
            nombre: format!("Á{}", "á".repeat(MAX_GENRE_NAME_CHARS - 1)),
        };
        assert!(accented.validate().is_ok());
    }

    #[test]
    fn test_genre_conversion() {
        let payload = CreateGenre::from(CreateGenreDto {
            nombre: "  Comedia ".into(),
        });
        assert_eq!(payload.name, "Comedia");

        let dto = GenreDto::from(Genre {
            id: 3,
            name: "Comedia".into(),
        });
        assert_eq!(
            serde_json::to_value(&dto).unwrap(),
            serde_json::json!({"id": 3, "nombre": "Comedia"})
        );
    }

    #[test]
    fn test_actor_dto_json() {
        let dto = ActorDto::from(Actor {
            id: 1,
            name: "Ricardo Darín".into(),
            birth_date: date!(1957 - 01 - 16),
            photo: None,
        });
        assert_eq!(
            serde_json::to_value(&dto).unwrap(),
            serde_json::json!({
                "id": 1,
                "nombre": "Ricardo Darín",
                "fechaNacimiento": "1957-01-16",
                "foto": null
            })
        );
    }

    #[test]
    fn test_actor_form_validation() {
        let form = ActorForm {
            nombre: "Ricardo Darín".into(),
            fecha_nacimiento: Some(date!(1957 - 01 - 16)),
            foto: None,
        };
        assert!(form.validate().is_ok());
        let entity = form.to_entity(Some("http://x/a.png".into())).unwrap();
        assert_eq!(entity.photo.as_deref(), Some("http://x/a.png"));

        let form = ActorForm {
            nombre: " ".into(),
            fecha_nacimiento: None,
            foto: None,
        };
        let report = form.validate().unwrap_err();
        assert_eq!(report.iter().count(), 2);
    }

    #[test]
    fn test_parse_birth_date() {
        assert_eq!(
            parse_birth_date("1970-01-31").unwrap(),
            Some(date!(1970 - 01 - 31))
        );
        assert_eq!(
            parse_birth_date("1970-01-31T00:00:00.000Z").unwrap(),
            Some(date!(1970 - 01 - 31))
        );
        assert_eq!(parse_birth_date("  ").unwrap(), None);
        assert!(parse_birth_date("31/01/1970").is_err());
        assert!(parse_birth_date("1970-02-31").is_err());
    }
}
