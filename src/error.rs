use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("every subtraction strategy failed")]
    BooleanOpFailed,

    #[error("degenerate layout configuration: {0}")]
    DegenerateConfig(String),

    #[error("candidate grid is too dense ({candidates} positions)")]
    GridTooDense { candidates: usize },

    #[error("the drawn shape does not overlap any existing area")]
    NoOverlappingPolygon,
}

pub type GeoResult<T> = Result<T, GeometryError>;
