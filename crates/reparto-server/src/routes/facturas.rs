//! Factura CRUD endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use reparto_core::types::{
    parse_fecha, Factura, FacturaDraft, FacturaFilter, FacturaPatch, HistoryEntry, NewArchivo,
    Page,
};

/// Request body for creating a factura.
///
/// Attachment descriptors reference uploads already validated and stored by
/// the file gateway; the binary bytes never pass through this API.
#[derive(Debug, Deserialize)]
pub struct CreateFacturaRequest {
    #[serde(flatten)]
    pub factura: FacturaDraft,
    #[serde(default)]
    pub archivos: Vec<ArchivoInput>,
}

#[derive(Debug, Deserialize)]
pub struct ArchivoInput {
    pub filename: String,
    pub mimetype: String,
    pub size: u64,
}

/// Response for creating a factura.
#[derive(Debug, Serialize)]
pub struct CreateFacturaResponse {
    pub id: i64,
}

/// Create a factura.
/// POST /facturas
pub async fn create_factura(
    State(state): State<AppState>,
    Json(request): Json<CreateFacturaRequest>,
) -> ApiResult<Json<CreateFacturaResponse>> {
    let nueva = request.factura.validate().map_err(ApiError::from)?;
    let archivos: Vec<NewArchivo> = request
        .archivos
        .into_iter()
        .map(|a| NewArchivo::new(a.filename, a.mimetype, a.size))
        .collect();

    let id = state
        .store
        .create(nueva, archivos)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(CreateFacturaResponse { id }))
}

/// Query parameters for listing facturas.
#[derive(Debug, Deserialize)]
pub struct ListFacturasQuery {
    pub cliente: Option<String>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub fecha: Option<String>,
    pub guia: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Response for listing facturas.
#[derive(Debug, Serialize)]
pub struct ListFacturasResponse {
    pub results: Vec<Factura>,
}

/// List facturas.
/// GET /facturas
pub async fn list_facturas(
    State(state): State<AppState>,
    Query(query): Query<ListFacturasQuery>,
) -> ApiResult<Json<ListFacturasResponse>> {
    let filter = parse_filter(&query)?;
    let page = Page::new(
        query.limit.unwrap_or(Page::default().limit),
        query.offset.unwrap_or(0),
    );

    let results = state
        .store
        .list(&filter, page)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ListFacturasResponse { results }))
}

/// Get a specific factura by id.
/// GET /facturas/:id
pub async fn get_factura(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Factura>> {
    let factura = state.store.get(id).await.map_err(ApiError::from)?;
    Ok(Json(factura))
}

/// Update a factura.
/// PUT /facturas/:id
pub async fn update_factura(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<FacturaPatch>,
) -> ApiResult<Json<Factura>> {
    let factura = state.store.update(id, patch).await.map_err(ApiError::from)?;
    Ok(Json(factura))
}

/// Response for factura history.
#[derive(Debug, Serialize)]
pub struct HistorialResponse {
    pub historial: Vec<HistoryEntry>,
}

/// Get a factura's audit trail, most recent entry first.
/// GET /facturas/:id/historial
pub async fn get_factura_historial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<HistorialResponse>> {
    let historial = state.store.history(id).await.map_err(ApiError::from)?;
    Ok(Json(HistorialResponse { historial }))
}

fn parse_filter(query: &ListFacturasQuery) -> Result<FacturaFilter, ApiError> {
    let mut filter = FacturaFilter::default();

    if let Some(cliente) = non_empty(&query.cliente) {
        filter.cliente = Some(cliente.parse::<i64>().map_err(|_| {
            ApiError::validation(format!("invalid cliente '{}'", cliente))
        })?);
    }
    if let Some(fecha) = non_empty(&query.fecha) {
        filter.fecha = Some(parse_fecha(fecha).map_err(ApiError::from)?);
    }
    if let Some(desde) = non_empty(&query.desde) {
        filter.desde = Some(parse_fecha(desde).map_err(ApiError::from)?);
    }
    if let Some(hasta) = non_empty(&query.hasta) {
        filter.hasta = Some(parse_fecha(hasta).map_err(ApiError::from)?);
    }
    if let Some(guia) = non_empty(&query.guia) {
        filter.guia = Some(guia.to_string());
    }
    if let Some(q) = non_empty(&query.q) {
        filter.q = Some(q.to_string());
    }

    Ok(filter)
}

/// Blank query parameters impose no constraint.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
