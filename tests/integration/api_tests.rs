//! API integration tests
//!
//! Run against a live server with an empty or disposable database:
//! `cargo test -- --ignored`

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000/api";

/// Unique suffix so repeated runs never collide on unique fields
fn sufijo() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("Clock before epoch")
        .as_nanos();
    format!("{}", nanos)
}

/// Register a fresh admin and return their token
async fn get_admin_token(client: &Client) -> String {
    let s = sufijo();
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "idUsuario": format!("ADM-{}", s),
            "nombre": "admin pruebas",
            "email": format!("admin{}@example.com", s),
            "password": "contrasena-segura",
            "rol": "admin"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse register response");
    body["data"]["token"]
        .as_str()
        .expect("No token in response")
        .to_string()
}

/// Create equipment and return its response body
async fn crear_equipo(client: &Client, token: &str, serial: &str, marca: &str) -> Value {
    let response = client
        .post(format!("{}/equipos", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "serial": serial,
            "marca": marca,
            "modelo": "X1",
            "tipoEquipo": "Laptop"
        }))
        .send()
        .await
        .expect("Failed to send create request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse create response")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
#[ignore]
async fn test_login_y_envelope() {
    let client = Client::new();
    let s = sufijo();
    let email = format!("login{}@example.com", s);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "idUsuario": format!("USR-{}", s),
            "nombre": "usuario login",
            "email": email,
            "password": "contrasena-segura"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "contrasena-segura" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].is_string());
    assert!(body["timestamp"].is_string());
    // The hash must never be serialized
    assert!(body["data"]["user"]["password"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_login_contrasena_incorrecta() {
    let client = Client::new();
    let s = sufijo();
    let email = format!("wrongpass{}@example.com", s);

    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "idUsuario": format!("USR-{}", s),
            "nombre": "usuario activo",
            "email": email,
            "password": "contrasena-segura"
        }))
        .send()
        .await
        .expect("Failed to send request");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "incorrecta123" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
    assert!(body["data"]["token"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_acceso_sin_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipos", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_rol_user_no_lista_usuarios() {
    let client = Client::new();
    let s = sufijo();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "idUsuario": format!("USR-{}", s),
            "nombre": "usuario plano",
            "email": format!("plano{}@example.com", s),
            "password": "contrasena-segura"
        }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["data"]["token"].as_str().expect("No token");

    let response = client
        .get(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_identificadores_secuenciales() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let s = sufijo();

    let primero = crear_equipo(&client, &token, &format!("SN1-{}", s), "Dell").await;
    let id_primero = primero["data"]["idEquipo"].as_str().expect("No idEquipo");
    assert!(id_primero.starts_with("EQ-"), "{}", id_primero);
    assert_eq!(id_primero.len(), 7);
    assert_eq!(primero["data"]["estado"], "Bodega");

    let segundo = crear_equipo(&client, &token, &format!("SN2-{}", s), "Dell").await;
    let id_segundo = segundo["data"]["idEquipo"].as_str().expect("No idEquipo");

    let n1: u32 = id_primero[3..].parse().expect("Invalid suffix");
    let n2: u32 = id_segundo[3..].parse().expect("Invalid suffix");
    assert_eq!(n2, n1 + 1);
}

#[tokio::test]
#[ignore]
async fn test_serial_duplicado() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let serial = format!("DUP-{}", sufijo());

    crear_equipo(&client, &token, &serial, "Lenovo").await;

    let response = client
        .post(format!("{}/equipos", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "serial": serial,
            "marca": "Lenovo",
            "modelo": "X2",
            "tipoEquipo": "Laptop"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_paginacion_consistente() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let marca = format!("MarcaPag{}", sufijo());

    for i in 0..12 {
        crear_equipo(&client, &token, &format!("PAG{}-{}", i, sufijo()), &marca).await;
    }

    let response = client
        .get(format!(
            "{}/equipos?marca={}&limite=5&pagina=2&sort=createdAt",
            BASE_URL, marca
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let equipos = body["data"]["equipos"].as_array().expect("No equipos array");
    assert_eq!(equipos.len(), 5);

    let pagination = &body["data"]["pagination"];
    assert_eq!(pagination["pagina"], 2);
    assert_eq!(pagination["limite"], 5);
    assert_eq!(pagination["total"], 12);
    assert_eq!(pagination["totalPaginas"], 3);
}

#[tokio::test]
#[ignore]
async fn test_limite_acotado() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/equipos?limite=500", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["pagination"]["limite"], 100);
}

#[tokio::test]
#[ignore]
async fn test_filtro_desconocido_es_400() {
    let client = Client::new();
    let token = get_admin_token(&client).await;

    let response = client
        .get(format!("{}/equipos?color=rojo", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_ciclo_de_asignacion() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let s = sufijo();

    // Provision a user and an equipment item
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "idUsuario": format!("EMP-{}", s),
            "nombre": "empleado asignado",
            "email": format!("empleado{}@example.com", s),
            "password": "contrasena-segura"
        }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let usuario_id = body["data"]["user"]["id"].as_i64().expect("No user id");

    let equipo = crear_equipo(&client, &token, &format!("ASG-{}", s), "HP").await;
    let equipo_id = equipo["data"]["id"].as_i64().expect("No equipo id");

    // Assign
    let response = client
        .post(format!("{}/asignaciones", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "usuario": usuario_id, "equipo": equipo_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let asignacion_id = body["data"]["id"].as_i64().expect("No asignacion id");

    // Equipment flips to Asignado and stamps the last assignment
    let response = client
        .get(format!("{}/equipos/{}", BASE_URL, equipo_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["estado"], "Asignado");
    assert_eq!(body["data"]["ultimaAsignacion"], asignacion_id);

    // A second active assignment for the same equipment is rejected
    let response = client
        .post(format!("{}/asignaciones", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "usuario": usuario_id, "equipo": equipo_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Deleting assigned equipment is rejected
    let response = client
        .delete(format!("{}/equipos/{}", BASE_URL, equipo_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Soft-deleting the holder is rejected
    let response = client
        .delete(format!("{}/users/{}", BASE_URL, usuario_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Finalize
    let response = client
        .put(format!("{}/asignaciones/{}", BASE_URL, asignacion_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "motivoDevolucion": "Fin de contrato" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["activo"], false);
    assert!(body["data"]["fechaDevolucion"].is_string());

    // Equipment rests after the return
    let response = client
        .get(format!("{}/equipos/{}", BASE_URL, equipo_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["estado"], "Reposo");

    // Finalizing twice is rejected
    let response = client
        .put(format!("{}/asignaciones/{}", BASE_URL, asignacion_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // The assignment no longer counts as active for the equipment
    let response = client
        .get(format!(
            "{}/asignaciones?activo=true&limite=100",
            BASE_URL
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let activas = body["data"]["asignaciones"].as_array().expect("No array");
    assert!(activas
        .iter()
        .all(|a| a["id"].as_i64() != Some(asignacion_id)));

    // Now the equipment can be deleted, and disappears from lookups
    let response = client
        .delete(format!("{}/equipos/{}", BASE_URL, equipo_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/equipos/{}", BASE_URL, equipo_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_busqueda_por_referencia_flexible() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let s = sufijo();

    let equipo = crear_equipo(&client, &token, &format!("FLEX-{}", s), "Asus").await;
    let id = equipo["data"]["id"].as_i64().expect("No id");
    let id_equipo = equipo["data"]["idEquipo"].as_str().expect("No idEquipo");

    // By store key
    let response = client
        .get(format!("{}/equipos/{}", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // By human-facing identifier
    let response = client
        .get(format!("{}/equipos/{}", BASE_URL, id_equipo))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["id"], id);

    // Malformed reference
    let response = client
        .get(format!("{}/equipos/no-es-un-id", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_serial_se_normaliza_a_mayusculas() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let s = sufijo();

    let equipo = crear_equipo(&client, &token, &format!("min-{}", s), "Acer").await;
    let serial = equipo["data"]["serial"].as_str().expect("No serial");
    assert_eq!(serial, format!("MIN-{}", s));

    // Lookup by serial is case-insensitive
    let response = client
        .get(format!("{}/equipos/serial/min-{}", BASE_URL, s))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}
