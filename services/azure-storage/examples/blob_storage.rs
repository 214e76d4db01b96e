use anyhow::Result;
use azsign_azure_storage::{Config, Credential, Protocol, RequestSigner};
use azsign_core::{Context, OsEnv};
use azsign_http_send_reqwest::ReqwestHttpSend;
use reqwest::Client;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    let client = Client::new();
    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::new(client.clone()))
        .with_env(OsEnv);

    // Credentials come from the environment:
    //   AZBLOB_ACCOUNT_NAME + AZBLOB_ACCOUNT_KEY        shared key
    //   AZURE_STORAGE_AUTH_TYPE=MSI [+ AZURE_CLIENT_ID]  managed identity
    //   AZURE_OAUTH_CLIENT_ENDPOINT + AZURE_CLIENT_ID + AZURE_CLIENT_SECRET
    //   AZURE_STORAGE_SAS_TOKEN                          shared access signature
    let credential = match Config::default().from_env(&ctx)?.into_credential() {
        Ok(credential) => credential,
        Err(err) => {
            println!("No Azure credentials found: {err}");
            println!("Falling back to a demo shared key, requests will be rejected");
            println!();
            Credential::with_shared_key("mystorageaccount", "ZGVtby1hY2NvdW50LWtleQ==")
        }
    };
    let account_name = credential
        .account_name()
        .unwrap_or("mystorageaccount")
        .to_string();

    let container = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mycontainer".to_string());
    let mut url = format!(
        "https://{account_name}.blob.core.windows.net/{container}?restype=container&comp=list"
    );
    if let Credential::SasToken { token } = &credential {
        url.push('&');
        url.push_str(token);
    }

    println!("Listing blobs in {container}");
    let req = http::Request::get(&url)
        .header("x-ms-version", "2021-12-02")
        .body(reqwest::Body::from(""))?;
    let (mut parts, body) = req.into_parts();

    RequestSigner::new()
        .sign(&ctx, &mut parts, &credential, Protocol::BlobQueueFile, 0)
        .await?;
    println!("Request signed");

    let req = http::Request::from_parts(parts, body);
    match client.execute(req.try_into()?).await {
        Ok(resp) => {
            println!("Response status: {}", resp.status());
            if resp.status().is_success() {
                println!("{}", resp.text().await?);
            }
        }
        Err(err) => println!("Request failed: {err}"),
    }

    Ok(())
}
