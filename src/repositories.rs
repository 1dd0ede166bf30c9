use crate::{
    domain::{MemeRepository, TemplateRepository},
    errors::RepoError,
    models::{Meme, MemeStatus, NewMeme, NewTemplate, Template},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::AttributeValue,
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{self, info};
use uuid::Uuid;

type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct DynamoDbTemplateRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbTemplateRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbTemplateRepository");
        Self { client, table_name }
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbMemeRepository {
    client: DynamoDbClient,
    table_name: String, // Store the table name
}

impl DynamoDbMemeRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbMemeRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl TemplateRepository for DynamoDbTemplateRepository {
    async fn insert(&self, new: NewTemplate) -> Result<Template, RepoError> {
        let template = Template {
            id: Uuid::new_v4(),
            created: Utc::now(),
            filename: new.filename,
        };
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(template_to_item(&template)))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put template (id: {})", self.table_name, template.id))
            .map_err(RepoError::BackendError)?;
        Ok(template)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Template>, RepoError> {
        match get_item(&self.client, &self.table_name, id).await? {
            Some(item) => item_to_template(&item).map(Some).ok_or_else(|| {
                tracing::error!(template_id = %id, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Template");
                RepoError::DataCorruption(format!(
                    "Failed to parse template data retrieved from DynamoDB table '{}' for id {}",
                    self.table_name, id
                ))
            }),
            None => Ok(None),
        }
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Template>, RepoError> {
        let items = scan_all(&self.client, &self.table_name).await?;
        let templates = parse_all(items, &self.table_name, item_to_template)?;
        Ok(newest_first(templates, limit, |t| t.created))
    }
}

#[async_trait]
impl MemeRepository for DynamoDbMemeRepository {
    async fn insert(&self, new: NewMeme) -> Result<Meme, RepoError> {
        let meme = Meme {
            id: Uuid::new_v4(),
            created: Utc::now(),
            status: MemeStatus::Created,
            template_id: new.template_id,
            top: new.top,
            bottom: new.bottom,
        };
        self.save(&meme).await?;
        Ok(meme)
    }

    /// Stores a `Meme` in the DynamoDB table using PutItem, replacing any previous version.
    async fn save(&self, meme: &Meme) -> Result<(), RepoError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(meme_to_item(meme)))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put meme (id: {})", self.table_name, meme.id))
            .map_err(RepoError::BackendError)?;
        tracing::debug!(meme_id = %meme.id, status = %meme.status, "DynamoDB: Meme stored");
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        match get_item(&self.client, &self.table_name, id).await? {
            Some(item) => item_to_meme(&item).map(Some).ok_or_else(|| {
                tracing::error!(meme_id = %id, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Meme");
                RepoError::DataCorruption(format!(
                    "Failed to parse meme data retrieved from DynamoDB table '{}' for id {}",
                    self.table_name, id
                ))
            }),
            None => Ok(None),
        }
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Meme>, RepoError> {
        let items = scan_all(&self.client, &self.table_name).await?;
        let memes = parse_all(items, &self.table_name, item_to_meme)?;
        Ok(newest_first(memes, limit, |m| m.created))
    }
}

async fn get_item(client: &DynamoDbClient, table_name: &str, id: Uuid) -> Result<Option<Item>, RepoError> {
    let id_str = id.to_string();
    let resp = client
        .get_item()
        .table_name(table_name)
        .key("id", AttributeValue::S(id_str.clone()))
        .send()
        .await
        .context(format!("DynamoDB (table: {}): Failed to get item (id: {})", table_name, id_str))
        .map_err(RepoError::BackendError)?;
    Ok(resp.item)
}

/// Reads every item of the table using Scan. Handles pagination.
/// Scans come back in table order; listings want the newest records first.
fn newest_first<T>(mut records: Vec<T>, limit: Option<usize>, created: fn(&T) -> DateTime<Utc>) -> Vec<T> {
    records.sort_by(|a, b| created(b).cmp(&created(a)));
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

async fn scan_all(client: &DynamoDbClient, table_name: &str) -> Result<Vec<Item>, RepoError> {
    tracing::debug!("DynamoDB: Scanning table '{}'", table_name);
    let mut items = Vec::new();
    let mut last_evaluated_key: Option<Item> = None;

    loop {
        let mut request_builder = client.scan().table_name(table_name);

        // Apply ExclusiveStartKey if paginating from previous response
        if let Some(lek) = last_evaluated_key {
            request_builder = request_builder.set_exclusive_start_key(Some(lek));
        }

        let resp = request_builder
            .send()
            .await
            .context(format!("DynamoDB: Failed to scan table '{}'", table_name))
            .map_err(RepoError::BackendError)?;

        if let Some(page) = resp.items {
            tracing::debug!("DynamoDB Scan (table: {}): Returned {} items", table_name, page.len());
            items.extend(page);
        }

        last_evaluated_key = resp.last_evaluated_key;
        if last_evaluated_key.is_none() {
            break;
        }
    }

    tracing::debug!("DynamoDB Scan (table: {}): Complete with {} items", table_name, items.len());
    Ok(items)
}

fn parse_all<T>(items: Vec<Item>, table_name: &str, parse: fn(&Item) -> Option<T>) -> Result<Vec<T>, RepoError> {
    items
        .iter()
        .map(|item| {
            parse(item).ok_or_else(|| {
                let item_id = item.get("id").and_then(|v| v.as_s().ok());
                tracing::error!(item.id = ?item_id, table_name = %table_name, "DynamoDB: Failed to parse item from scan");
                RepoError::DataCorruption(format!(
                    "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                    item_id, table_name
                ))
            })
        })
        .collect()
}

fn template_to_item(template: &Template) -> Item {
    HashMap::from([
        ("id".to_string(), AttributeValue::S(template.id.to_string())),
        ("created".to_string(), AttributeValue::S(template.created.to_rfc3339())),
        ("filename".to_string(), AttributeValue::S(template.filename.clone())),
    ])
}

fn meme_to_item(meme: &Meme) -> Item {
    HashMap::from([
        ("id".to_string(), AttributeValue::S(meme.id.to_string())),
        ("created".to_string(), AttributeValue::S(meme.created.to_rfc3339())),
        ("status".to_string(), AttributeValue::S(meme.status.as_str().to_string())),
        ("template_id".to_string(), AttributeValue::S(meme.template_id.to_string())),
        ("top".to_string(), AttributeValue::S(meme.top.clone())),
        ("bottom".to_string(), AttributeValue::S(meme.bottom.clone())),
    ])
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name)?.as_s().ok().map(String::as_str)
}

fn uuid_attr(item: &Item, name: &str) -> Option<Uuid> {
    Uuid::parse_str(string_attr(item, name)?).ok()
}

fn timestamp_attr(item: &Item, name: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(string_attr(item, name)?)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn item_to_template(item: &Item) -> Option<Template> {
    Some(Template {
        id: uuid_attr(item, "id")?,
        created: timestamp_attr(item, "created")?,
        filename: string_attr(item, "filename")?.to_string(),
    })
}

fn item_to_meme(item: &Item) -> Option<Meme> {
    Some(Meme {
        id: uuid_attr(item, "id")?,
        created: timestamp_attr(item, "created")?,
        status: string_attr(item, "status")?.parse().ok()?,
        template_id: uuid_attr(item, "template_id")?,
        top: string_attr(item, "top")?.to_string(),
        bottom: string_attr(item, "bottom")?.to_string(),
    })
}
