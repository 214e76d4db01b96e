// Headers used in azure services.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_HEADER_PREFIX: &str = "x-ms-";
pub const CONTENT_MD5: &str = "content-md5";
pub const METADATA: &str = "metadata";

// Query parameters used in canonicalization.
pub const COMP: &str = "comp";

// Token endpoints.
pub const DEFAULT_MSI_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
pub const DEFAULT_MSI_AUTHORITY: &str = "https://login.microsoftonline.com/";
pub const MSI_API_VERSION: &str = "2018-02-01";
pub const STORAGE_RESOURCE: &str = "https://storage.azure.com/";
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
pub const OAUTH2_V2_PATH: &str = "/oauth2/v2.0/";

// Env values used in azure services.
pub const AZBLOB_ACCOUNT_NAME: &str = "AZBLOB_ACCOUNT_NAME";
pub const AZBLOB_ACCOUNT_KEY: &str = "AZBLOB_ACCOUNT_KEY";
pub const AZURE_STORAGE_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";
pub const AZURE_STORAGE_AUTH_TYPE: &str = "AZURE_STORAGE_AUTH_TYPE";
pub const AZURE_MSI_ENDPOINT: &str = "AZURE_MSI_ENDPOINT";
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const AZURE_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";
pub const AZURE_OAUTH_CLIENT_ENDPOINT: &str = "AZURE_OAUTH_CLIENT_ENDPOINT";
pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
