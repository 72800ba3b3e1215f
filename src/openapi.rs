//! Stage 5: OpenAPI 3.0.0 document generation
//!
//! Emits two documents per artifact set: one covering resource endpoints and
//! one covering descriptor endpoints. Each resource contributes a request
//! body component, a reference component built from its flattened identity,
//! hoisted collection item components, five operations across two paths, and
//! a tag. The parameter and response component libraries are fixed.

use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{ArtifactError, Result};
use crate::mapping::PropertyMappings;
use crate::model::{Entity, EntityId, EntityKind, MetamodelGraph, PropertyId, PropertyKind};
use crate::naming::{decapitalize, pluralize, singularize};
use crate::resolve::{is_required, prefixed_name, CollectedProperty, EntityMappings, PropertyModifier};

/// The resource name a top-level entity exposes; descriptors carry the
/// `Descriptor` suffix
pub fn resource_name(entity: &Entity) -> String {
    match entity.kind {
        EntityKind::Descriptor => format!("{}Descriptor", entity.name),
        _ => entity.name.clone(),
    }
}

/// The URL segment a resource is served under
pub fn endpoint_name(entity: &Entity) -> String {
    decapitalize(&pluralize(&resource_name(entity)))
}

/// Generates OpenAPI documents from the resolution stage outputs
pub struct OpenApiGenerator<'a> {
    graph: &'a MetamodelGraph,
    property_mappings: &'a PropertyMappings,
    entity_mappings: &'a EntityMappings,
    config: &'a GeneratorConfig,
}

impl<'a> OpenApiGenerator<'a> {
    pub fn new(
        graph: &'a MetamodelGraph,
        property_mappings: &'a PropertyMappings,
        entity_mappings: &'a EntityMappings,
        config: &'a GeneratorConfig,
    ) -> Self {
        OpenApiGenerator {
            graph,
            property_mappings,
            entity_mappings,
            config,
        }
    }

    /// The document covering domain entity and association endpoints
    pub fn resources_document(&self) -> Result<Value> {
        self.document_for(false)
    }

    /// The document covering descriptor endpoints
    pub fn descriptors_document(&self) -> Result<Value> {
        self.document_for(true)
    }

    fn document_for(&self, descriptors: bool) -> Result<Value> {
        let mut schemas: IndexMap<String, Value> = IndexMap::new();
        let mut paths: IndexMap<String, Value> = IndexMap::new();
        let mut tags: Vec<(String, String)> = Vec::new();

        for entity_id in self.graph.entity_ids() {
            let entity = self.graph.entity(entity_id);
            let include = if descriptors {
                entity.kind == EntityKind::Descriptor
            } else {
                entity.kind.has_document_schema()
            };
            if !include {
                continue;
            }

            let component_name = format!("{}_{}", entity.namespace, resource_name(entity));
            if entity.kind == EntityKind::Descriptor {
                schemas.insert(component_name.clone(), descriptor_request_body());
            } else {
                schemas.insert(
                    format!("{}_{}_Reference", entity.namespace, entity.name),
                    self.reference_component(entity_id),
                );
                let mut hoisted: IndexMap<String, Value> = IndexMap::new();
                let body = self.request_body_component(entity_id, &mut hoisted)?;
                schemas.insert(component_name.clone(), body);
                schemas.extend(hoisted);
            }

            let endpoint = endpoint_name(entity);
            let namespace_segment = entity.namespace.to_lowercase();
            paths.insert(
                format!("/{namespace_segment}/{endpoint}"),
                json!({
                    "get": self.get_by_query_operation(entity_id, &component_name, &endpoint),
                    "post": post_operation(&resource_name(entity), &component_name, &endpoint),
                }),
            );
            paths.insert(
                format!("/{namespace_segment}/{endpoint}/{{id}}"),
                json!({
                    "delete": delete_operation(&resource_name(entity), &endpoint),
                    "get": get_by_id_operation(&resource_name(entity), &component_name, &endpoint),
                    "put": put_operation(&resource_name(entity), &component_name, &endpoint),
                }),
            );
            tags.push((endpoint, entity.documentation.clone()));
        }

        tags.sort();
        let tags: Vec<Value> = tags
            .into_iter()
            .map(|(name, description)| json!({ "name": name, "description": description }))
            .collect();

        debug!(descriptors, schemas = schemas.len(), paths = paths.len(), "openapi document generated");

        let api = &self.config.open_api;
        Ok(json!({
            "components": {
                "parameters": hardcoded_parameters(),
                "responses": hardcoded_responses(),
                "schemas": schemas,
            },
            "info": {
                "contact": { "url": api.contact_url },
                "description": api.description,
                "title": api.title,
                "version": api.version,
            },
            "openapi": "3.0.0",
            "paths": paths,
            "servers": [ { "url": "" } ],
            "tags": tags,
        }))
    }

    /// The reference component: one field per flattened identity leaf
    fn reference_component(&self, entity_id: EntityId) -> Value {
        let mut properties: IndexMap<String, Value> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();

        for flattened in &self.entity_mappings[&entity_id].flattened_identity_properties {
            let leaf_mapping = &self.property_mappings[&flattened.identity_property];
            let name = decapitalize(&leaf_mapping.full_name);
            if !required.contains(&name) {
                required.push(name.clone());
            }
            properties.insert(name, self.scalar_component(flattened.identity_property));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn request_body_component(
        &self,
        entity_id: EntityId,
        hoisted: &mut IndexMap<String, Value>,
    ) -> Result<Value> {
        let entity = self.graph.entity(entity_id);
        let prefix = format!("{}_{}", entity.namespace, entity.name);
        self.object_component(
            &self.entity_mappings[&entity_id].collected_properties,
            &PropertyModifier::default(),
            &prefix,
            hoisted,
        )
    }

    fn object_component(
        &self,
        collected: &[CollectedProperty],
        outer: &PropertyModifier,
        prefix: &str,
        hoisted: &mut IndexMap<String, Value>,
    ) -> Result<Value> {
        let mut properties: IndexMap<String, Value> = IndexMap::new();
        let mut required: Vec<String> = Vec::new();

        for cp in collected {
            let modifier = outer.concat(&cp.modifier);
            let mapping = &self.property_mappings[&cp.property];
            let name = prefixed_name(&mapping.decollisioned_top_level_name, &modifier);
            let value = self.property_component(cp.property, &modifier, prefix, hoisted)?;
            if is_required(self.graph, cp.property, &modifier) {
                required.push(name.clone());
            }
            properties.insert(name, value);
        }

        let mut object = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            object["required"] = json!(required);
        }
        Ok(object)
    }

    /// Collection items and commons hoist into their own named components,
    /// chained under the owning resource's component name
    fn property_component(
        &self,
        id: PropertyId,
        modifier: &PropertyModifier,
        prefix: &str,
        hoisted: &mut IndexMap<String, Value>,
    ) -> Result<Value> {
        let property = self.graph.property(id);
        let mapping = &self.property_mappings[&id];
        let min_items = if is_required(self.graph, id, modifier) { 1 } else { 0 };

        if mapping.is_reference_collection {
            let target = self.graph.entity(target_of(self.graph, id)?);
            let reference_name = prefixed_name(&mapping.reference_collection_name, modifier);
            let item_name = format!("{prefix}_{}", property.full_property_name());
            hoisted.insert(
                item_name.clone(),
                json!({
                    "type": "object",
                    "properties": {
                        (reference_name.clone()): {
                            "$ref": format!("#/components/schemas/{}_{}_Reference", target.namespace, target.name),
                        },
                    },
                    "required": [reference_name],
                }),
            );
            return Ok(json!({
                "type": "array",
                "items": { "$ref": format!("#/components/schemas/{item_name}") },
                "minItems": min_items,
                "uniqueItems": false,
            }));
        }

        if mapping.is_scalar_reference {
            let target = self.graph.entity(target_of(self.graph, id)?);
            return Ok(json!({
                "$ref": format!("#/components/schemas/{}_{}_Reference", target.namespace, target.name),
            }));
        }

        if mapping.is_descriptor_collection {
            let descriptor_name = prefixed_name(&mapping.descriptor_collection_name, modifier);
            let item_name = format!("{prefix}_{}", property.full_property_name());
            hoisted.insert(
                item_name.clone(),
                json!({
                    "type": "object",
                    "properties": {
                        (descriptor_name.clone()): {
                            "type": "string",
                            "maxLength": 306,
                            "description": "An Ed-Fi Descriptor",
                        },
                    },
                    "required": [descriptor_name],
                }),
            );
            return Ok(json!({
                "type": "array",
                "items": { "$ref": format!("#/components/schemas/{item_name}") },
                "minItems": min_items,
                "uniqueItems": false,
            }));
        }

        if mapping.is_common_collection || mapping.is_scalar_common {
            let target = target_of(self.graph, id)?;
            let item_name = format!("{prefix}_{}", property.full_property_name());
            let object = self.object_component(
                &self.entity_mappings[&target].collected_properties,
                modifier,
                &item_name,
                hoisted,
            )?;
            hoisted.insert(item_name.clone(), object);
            let reference = json!({ "$ref": format!("#/components/schemas/{item_name}") });
            if mapping.is_common_collection {
                return Ok(json!({
                    "type": "array",
                    "items": reference,
                    "minItems": 0,
                    "uniqueItems": false,
                }));
            }
            return Ok(reference);
        }

        if property.is_collection {
            let field_name = singularize(&prefixed_name(&mapping.full_name, modifier));
            let item_name = format!("{prefix}_{}", property.full_property_name());
            hoisted.insert(
                item_name.clone(),
                json!({
                    "type": "object",
                    "properties": { (field_name.clone()): self.scalar_component(id) },
                    "required": [field_name],
                }),
            );
            return Ok(json!({
                "type": "array",
                "items": { "$ref": format!("#/components/schemas/{item_name}") },
                "minItems": min_items,
                "uniqueItems": false,
            }));
        }

        if matches!(property.kind, PropertyKind::SchoolYearEnumeration) {
            return Ok(json!({
                "type": "object",
                "description": property.documentation,
                "properties": {
                    "schoolYear": { "type": "integer", "format": "int32" },
                },
            }));
        }

        Ok(self.scalar_component(id))
    }

    /// OpenAPI schema object for a scalar property, with description and the
    /// identity marker
    fn scalar_component(&self, id: PropertyId) -> Value {
        let property = self.graph.property(id);
        let mut schema = openapi_type(self.graph, id);
        schema["description"] = json!(property.documentation);
        if property.is_identity {
            schema["x-Ed-Fi-isIdentity"] = json!(true);
        }
        schema
    }

    /// Query parameters for the collection GET: the static set plus one per
    /// top-level scalar field
    fn get_by_query_parameters(&self, entity_id: EntityId) -> Vec<Value> {
        let mut parameters = static_query_parameters();

        for cp in &self.entity_mappings[&entity_id].collected_properties {
            let property = self.graph.property(cp.property);
            let mapping = &self.property_mappings[&cp.property];
            if property.kind.is_entity_reference()
                || mapping.is_scalar_common
                || mapping.is_common_collection
                || property.is_collection
            {
                continue;
            }

            let name = prefixed_name(&mapping.decollisioned_top_level_name, &cp.modifier);
            let mut parameter = json!({
                "name": name,
                "in": "query",
                "description": property.documentation,
                "schema": openapi_type(self.graph, cp.property),
            });
            if property.is_identity {
                parameter["x-Ed-Fi-isIdentity"] = json!(true);
            }
            parameters.push(parameter);
        }

        parameters
    }

    fn get_by_query_operation(&self, entity_id: EntityId, component_name: &str, endpoint: &str) -> Value {
        let entity = self.graph.entity(entity_id);
        let parameters = if entity.kind == EntityKind::Descriptor {
            descriptor_query_parameters()
        } else {
            self.get_by_query_parameters(entity_id)
        };
        json!({
            "description": "This GET operation provides access to resources using the \"Get\" search pattern.  The values of any properties of the resource that are specified will be used to return all matching results (if it exists).",
            "operationId": format!("get{}", pluralize(&resource_name(entity))),
            "parameters": parameters,
            "responses": {
                "200": {
                    "description": "The requested resource was successfully retrieved.",
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "array",
                                "items": { "$ref": format!("#/components/schemas/{component_name}") },
                            },
                        },
                    },
                },
                "304": { "$ref": "#/components/responses/NotModified" },
                "400": { "$ref": "#/components/responses/BadRequest" },
                "401": { "$ref": "#/components/responses/Unauthorized" },
                "403": { "$ref": "#/components/responses/Forbidden" },
                "404": { "$ref": "#/components/responses/NotFoundUseSnapshot" },
                "500": { "$ref": "#/components/responses/Error" },
            },
            "summary": "Retrieves specific resources using the resource's property values (using the \"Get\" pattern).",
            "tags": [endpoint],
        })
    }
}

fn target_of(graph: &MetamodelGraph, id: PropertyId) -> Result<EntityId> {
    let property = graph.property(id);
    property.kind.target().ok_or_else(|| {
        ArtifactError::InvalidDefinition(format!(
            "reference property {} has no target entity",
            property.name
        ))
    })
}

fn post_operation(resource: &str, component_name: &str, endpoint: &str) -> Value {
    json!({
        "description": "The POST operation can be used to create or update resources. In database terms, this is often referred to as an \"upsert\" operation (insert + update). Clients should NOT include the resource \"id\" in the JSON body because it will result in an error. The web service will identify whether the resource already exists based on the natural key values provided, and update or create the resource appropriately. It is recommended to use POST for both create and update except while updating natural key of a resource in which case PUT operation must be used.",
        "operationId": format!("post{}", resource),
        "requestBody": {
            "description": format!("The JSON representation of the {} resource to be created or updated.", resource),
            "content": {
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{component_name}") },
                },
            },
            "required": true,
            "x-bodyName": resource,
        },
        "responses": {
            "200": { "$ref": "#/components/responses/Updated" },
            "201": { "$ref": "#/components/responses/Created" },
            "400": { "$ref": "#/components/responses/BadRequest" },
            "401": { "$ref": "#/components/responses/Unauthorized" },
            "403": { "$ref": "#/components/responses/Forbidden" },
            "405": { "description": "Method Is Not Allowed. When the Use-Snapshot header is set to true, the method is not allowed." },
            "409": { "$ref": "#/components/responses/Conflict" },
            "412": { "$ref": "#/components/responses/PreconditionFailed" },
            "500": { "$ref": "#/components/responses/Error" },
        },
        "summary": "Creates or updates resources based on the natural key values of the supplied resource.",
        "tags": [endpoint],
    })
}

fn get_by_id_operation(resource: &str, component_name: &str, endpoint: &str) -> Value {
    json!({
        "description": "This GET operation retrieves a resource by the specified resource identifier.",
        "operationId": format!("get{}ById", pluralize(resource)),
        "parameters": by_id_parameters_with_snapshot(),
        "responses": {
            "200": {
                "description": "The requested resource was successfully retrieved.",
                "content": {
                    "application/json": {
                        "schema": { "$ref": format!("#/components/schemas/{component_name}") },
                    },
                },
            },
            "304": { "$ref": "#/components/responses/NotModified" },
            "400": { "$ref": "#/components/responses/BadRequest" },
            "401": { "$ref": "#/components/responses/Unauthorized" },
            "403": { "$ref": "#/components/responses/Forbidden" },
            "404": { "$ref": "#/components/responses/NotFoundUseSnapshot" },
            "500": { "$ref": "#/components/responses/Error" },
        },
        "summary": "Retrieves a specific resource using the resource's identifier (using the \"Get By Id\" pattern).",
        "tags": [endpoint],
    })
}

fn put_operation(resource: &str, component_name: &str, endpoint: &str) -> Value {
    json!({
        "description": "The PUT operation is used to update a resource by identifier. If the resource identifier (\"id\") is provided in the JSON body, it will be ignored. Additionally, this API resource is not configured for cascading natural key updates. Natural key values for this resource cannot be changed using PUT operation, so the recommendation is to use POST as that supports upsert behavior.",
        "operationId": format!("put{}", resource),
        "parameters": by_id_parameters_with_snapshot(),
        "requestBody": {
            "description": format!("The JSON representation of the {} resource to be created or updated.", resource),
            "content": {
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{component_name}") },
                },
            },
        },
        "responses": {
            "204": { "$ref": "#/components/responses/Updated" },
            "400": { "$ref": "#/components/responses/BadRequest" },
            "401": { "$ref": "#/components/responses/Unauthorized" },
            "403": { "$ref": "#/components/responses/Forbidden" },
            "404": { "$ref": "#/components/responses/NotFound" },
            "405": { "description": "Method Is Not Allowed. When the Use-Snapshot header is set to true, the method is not allowed." },
            "409": { "$ref": "#/components/responses/Conflict" },
            "412": { "$ref": "#/components/responses/PreconditionFailed" },
            "500": { "$ref": "#/components/responses/Error" },
        },
        "summary": "Updates a resource based on the resource identifier.",
        "tags": [endpoint],
    })
}

fn delete_operation(resource: &str, endpoint: &str) -> Value {
    json!({
        "description": "The DELETE operation is used to delete an existing resource by identifier. If the resource doesn't exist, an error will result (the resource will not be found).",
        "operationId": format!("delete{}ById", pluralize(resource)),
        "parameters": by_id_parameters(),
        "responses": {
            "204": { "$ref": "#/components/responses/Updated" },
            "400": { "$ref": "#/components/responses/BadRequest" },
            "401": { "$ref": "#/components/responses/Unauthorized" },
            "403": { "$ref": "#/components/responses/Forbidden" },
            "404": { "$ref": "#/components/responses/NotFound" },
            "405": { "description": "Method Is Not Allowed. When the Use-Snapshot header is set to true, the method is not allowed." },
            "409": { "$ref": "#/components/responses/Conflict" },
            "412": { "$ref": "#/components/responses/PreconditionFailed" },
            "500": { "$ref": "#/components/responses/Error" },
        },
        "summary": "Deletes an existing resource using the resource identifier.",
        "tags": [endpoint],
    })
}

/// The OpenAPI type shape for a scalar property
fn openapi_type(graph: &MetamodelGraph, id: PropertyId) -> Value {
    let property = graph.property(id);
    match property.kind {
        PropertyKind::Boolean => json!({ "type": "boolean" }),
        PropertyKind::Duration => json!({ "type": "string", "maxLength": 30 }),
        PropertyKind::Currency | PropertyKind::Decimal | PropertyKind::Percent => {
            json!({ "type": "number", "format": "double" })
        }
        PropertyKind::Date => json!({ "type": "string", "format": "date" }),
        PropertyKind::DateTime => json!({ "type": "string", "format": "date-time" }),
        PropertyKind::Descriptor(_) | PropertyKind::Enumeration(_) => {
            json!({ "type": "string", "maxLength": 306 })
        }
        PropertyKind::Integer
        | PropertyKind::Short
        | PropertyKind::Year
        | PropertyKind::SchoolYearEnumeration => json!({ "type": "integer", "format": "int32" }),
        PropertyKind::String => {
            let mut schema = json!({ "type": "string" });
            if let Some(min_length) = property.facets.min_length {
                schema["minLength"] = json!(min_length);
            }
            if let Some(max_length) = property.facets.max_length {
                schema["maxLength"] = json!(max_length);
            }
            schema
        }
        PropertyKind::Time => json!({ "type": "string" }),
        _ => json!({ "type": "string" }),
    }
}

/// The fixed descriptor request body component
fn descriptor_request_body() -> Value {
    json!({
        "type": "object",
        "properties": {
            "codeValue": {
                "type": "string",
                "maxLength": 50,
                "description": "A code or abbreviation that is used to refer to the descriptor.",
                "x-Ed-Fi-isIdentity": true,
            },
            "description": {
                "type": "string",
                "maxLength": 1024,
                "description": "The description of the descriptor.",
            },
            "effectiveBeginDate": {
                "type": "string",
                "format": "date",
                "description": "The beginning date of the period when the descriptor is in effect. If omitted, the default is immediate effectiveness.",
            },
            "effectiveEndDate": {
                "type": "string",
                "format": "date",
                "description": "The end date of the period when the descriptor is in effect.",
            },
            "namespace": {
                "type": "string",
                "maxLength": 255,
                "description": "A globally unique namespace that identifies this descriptor set. Author is strongly encouraged to use the Universal Resource Identifier (http, ftp, file, etc.) for the source of the descriptor definition. Best practice is for this source to be the descriptor file itself, so that it can be machine-readable and be fetched in real-time, if necessary.",
                "x-Ed-Fi-isIdentity": true,
            },
            "shortDescription": {
                "type": "string",
                "maxLength": 75,
                "description": "A shortened description for the descriptor.",
            },
        },
        "required": ["codeValue", "namespace", "shortDescription"],
    })
}

/// The fixed descriptor collection GET query parameters
fn descriptor_query_parameters() -> Vec<Value> {
    let mut parameters = static_query_parameters();
    parameters.extend([
        json!({
            "name": "codeValue",
            "in": "query",
            "description": "A code or abbreviation that is used to refer to the descriptor.",
            "schema": { "maxLength": 50, "type": "string" },
            "x-Ed-Fi-isIdentity": true,
        }),
        json!({
            "name": "description",
            "in": "query",
            "description": "The description of the descriptor.",
            "schema": { "maxLength": 1024, "type": "string" },
        }),
        json!({
            "name": "effectiveBeginDate",
            "in": "query",
            "description": "The beginning date of the period when the descriptor is in effect. If omitted, the default is immediate effectiveness.",
            "schema": { "type": "string", "format": "date" },
        }),
        json!({
            "name": "effectiveEndDate",
            "in": "query",
            "description": "The end date of the period when the descriptor is in effect.",
            "schema": { "type": "string", "format": "date" },
        }),
        json!({
            "name": "namespace",
            "in": "query",
            "description": "A globally unique namespace that identifies this descriptor set. Author is strongly encouraged to use the Universal Resource Identifier (http, ftp, file, etc.) for the source of the descriptor definition. Best practice is for this source to be the descriptor file itself, so that it can be machine-readable and be fetched in real-time, if necessary.",
            "schema": { "maxLength": 255, "type": "string" },
            "x-Ed-Fi-isIdentity": true,
        }),
        json!({
            "name": "shortDescription",
            "in": "query",
            "description": "A shortened description for the descriptor.",
            "schema": { "maxLength": 75, "type": "string" },
        }),
    ]);
    parameters
}

/// The parameters shared by every collection GET
fn static_query_parameters() -> Vec<Value> {
    vec![
        json!({ "$ref": "#/components/parameters/offset" }),
        json!({ "$ref": "#/components/parameters/limit" }),
        json!({ "$ref": "#/components/parameters/MinChangeVersion" }),
        json!({ "$ref": "#/components/parameters/MaxChangeVersion" }),
        json!({ "$ref": "#/components/parameters/totalCount" }),
        json!({
            "name": "id",
            "in": "query",
            "description": "",
            "schema": { "type": "string" },
        }),
    ]
}

fn by_id_parameters() -> Vec<Value> {
    vec![
        json!({
            "name": "id",
            "in": "path",
            "description": "A resource identifier that uniquely identifies the resource.",
            "required": true,
            "schema": { "type": "string" },
        }),
        json!({ "$ref": "#/components/parameters/If-None-Match" }),
    ]
}

fn by_id_parameters_with_snapshot() -> Vec<Value> {
    let mut parameters = by_id_parameters();
    parameters.push(json!({
        "name": "Use-Snapshot",
        "in": "header",
        "description": "Indicates if the configured Snapshot should be used.",
        "schema": { "type": "boolean", "default": false },
    }));
    parameters
}

/// The fixed parameter component library
fn hardcoded_parameters() -> Value {
    json!({
        "offset": {
            "name": "offset",
            "in": "query",
            "description": "Indicates how many items should be skipped before returning results.",
            "schema": { "type": "integer", "format": "int32" },
        },
        "limit": {
            "name": "limit",
            "in": "query",
            "description": "Indicates the maximum number of items that should be returned in the results.",
            "schema": { "maximum": 500, "minimum": 0, "type": "integer", "format": "int32", "default": 25 },
        },
        "MinChangeVersion": {
            "name": "minChangeVersion",
            "in": "query",
            "description": "Used in synchronization to set sequence minimum ChangeVersion",
            "schema": { "type": "integer", "format": "int64" },
        },
        "MaxChangeVersion": {
            "name": "maxChangeVersion",
            "in": "query",
            "description": "Used in synchronization to set sequence maximum ChangeVersion",
            "schema": { "type": "integer", "format": "int64" },
        },
        "If-None-Match": {
            "name": "If-None-Match",
            "in": "header",
            "description": "The previously returned ETag header value, used here to prevent the unnecessary data transfer of an unchanged resource.",
            "schema": { "type": "string" },
        },
        "fields": {
            "name": "fields",
            "in": "query",
            "description": "Specifies a subset of properties that should be returned for each entity (e.g. \"property1,collection1(collProp1,collProp2)\").",
            "schema": { "type": "string" },
        },
        "queryExpression": {
            "name": "q",
            "in": "query",
            "description": "Specifies a query filter expression for the request. Currently only supports range-based queries on dates and numbers (e.g. \"schoolId:[255901000...255901002]\" and \"BeginDate:[2016-03-07...2016-03-10]\").",
            "schema": { "type": "string" },
        },
        "totalCount": {
            "name": "totalCount",
            "in": "query",
            "description": "Indicates if the total number of items available should be returned in the 'Total-Count' header of the response.  If set to false, 'Total-Count' header will not be provided. Must be false when using cursor paging (with pageToken).",
            "schema": { "type": "boolean", "default": false },
        },
        "pageToken": {
            "name": "pageToken",
            "in": "query",
            "description": "The token of the page to retrieve, obtained either from the \"Next-Page-Token\" header of the previous request, or from the \"partitions\" endpoint for the resource. Cannot be used with limit/offset paging.",
            "schema": { "type": "string" },
        },
        "pageSize": {
            "name": "pageSize",
            "in": "query",
            "description": "The maximum number of items to retrieve in the page. For use with pageToken (cursor paging) only.",
            "schema": { "minimum": 0, "type": "integer", "format": "int32", "default": 25 },
        },
        "numberOfPartitions": {
            "name": "number",
            "in": "query",
            "description": "The number of evenly distributed partitions to provide for client-side parallel processing. If unspecified, a reasonable set of partitions will be determined based on the total number of accessible items.",
            "schema": { "maximum": 200, "minimum": 1, "type": "integer", "format": "int32" },
        },
    })
}

/// The fixed response component library
fn hardcoded_responses() -> Value {
    json!({
        "Created": {
            "description": "The resource was created.  An ETag value is available in the ETag header, and the location of the resource is available in the Location header of the response.",
        },
        "Updated": {
            "description": "The resource was updated.  An updated ETag value is available in the ETag header of the response.",
        },
        "Deleted": {
            "description": "The resource was successfully deleted.",
        },
        "NotModified": {
            "description": "The resource's current server-side ETag value matched the If-None-Match header value supplied with the request indicating the resource has not been modified.",
        },
        "BadRequest": {
            "description": "Bad Request. The request was invalid and cannot be completed. See the response body for specific validation errors. This will typically be an issue with the query parameters or their values.",
            "content": { "application/json": {} },
        },
        "Unauthorized": {
            "description": "Unauthorized. The request requires authentication. The OAuth bearer token was either not provided or is invalid. The operation may succeed once authentication has been successfully completed.",
        },
        "Forbidden": {
            "description": "Forbidden. The request cannot be completed in the current authorization context. Contact your administrator if you believe this operation should be allowed.",
        },
        "NotFound": {
            "description": "The resource could not be found.",
        },
        "NotFoundUseSnapshot": {
            "description": "The resource could not be found. If Use-Snapshot header is set to true, this response can indicate the snapshot may have been removed.",
        },
        "Conflict": {
            "description": "Conflict.  The request cannot be completed because it would result in an invalid state.  See the response body for details.",
            "content": { "application/json": {} },
        },
        "PreconditionFailed": {
            "description": "The resource's current server-side ETag value does not match the supplied If-Match header value in the request. This indicates the resource has been modified by another consumer.",
        },
        "Error": {
            "description": "An unhandled error occurred on the server. See the response body for details.",
            "content": { "application/json": {} },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::map_properties;
    use crate::model::GraphBuilder;
    use crate::overlay::resolve_overlays;
    use crate::resolve::resolve_entities;

    struct Fixture {
        graph: MetamodelGraph,
        property_mappings: PropertyMappings,
        entity_mappings: EntityMappings,
        config: GeneratorConfig,
    }

    impl Fixture {
        fn build(builder: GraphBuilder) -> Self {
            let graph = builder.build().unwrap();
            let overlays = resolve_overlays(&graph).unwrap();
            let property_mappings = map_properties(&graph);
            let entity_mappings = resolve_entities(&graph, &overlays);
            Fixture {
                graph,
                property_mappings,
                entity_mappings,
                config: GeneratorConfig::default(),
            }
        }

        fn generator(&self) -> OpenApiGenerator<'_> {
            OpenApiGenerator::new(
                &self.graph,
                &self.property_mappings,
                &self.entity_mappings,
                &self.config,
            )
        }
    }

    fn school_builder() -> GraphBuilder {
        let mut builder = GraphBuilder::new("EdFi");
        builder.descriptor("GradeLevel", "Grade level doc");
        builder
            .domain_entity("School", "School doc")
            .integer_identity("SchoolId", "The school identifier")
            .string("NameOfInstitution", "The name", true, false, Some(75), None)
            .descriptor_property("GradeLevel", "Grades offered", false, true);
        builder
    }

    #[test]
    fn test_resources_document_skeleton() {
        let fixture = Fixture::build(school_builder());
        let document = fixture.generator().resources_document().unwrap();

        assert_eq!(document["openapi"], "3.0.0");
        assert_eq!(document["info"]["title"], "Ed-Fi Data Management Service API");
        assert_eq!(document["info"]["version"], "1");
        assert_eq!(
            document["info"]["contact"]["url"],
            "https://www.ed-fi.org/what-is-ed-fi/contact/"
        );
        assert_eq!(document["servers"][0]["url"], "");
        assert!(document["components"]["parameters"]["limit"]["schema"]["default"] == 25);
        assert_eq!(
            document["components"]["responses"]["NotFound"]["description"],
            "The resource could not be found."
        );
    }

    #[test]
    fn test_resource_paths_and_operation_ids() {
        let fixture = Fixture::build(school_builder());
        let document = fixture.generator().resources_document().unwrap();

        let collection = &document["paths"]["/edfi/schools"];
        assert_eq!(collection["get"]["operationId"], "getSchools");
        assert_eq!(collection["post"]["operationId"], "postSchool");
        assert_eq!(collection["post"]["requestBody"]["x-bodyName"], "School");

        let item = &document["paths"]["/edfi/schools/{id}"];
        assert_eq!(item["get"]["operationId"], "getSchoolsById");
        assert_eq!(item["put"]["operationId"], "putSchool");
        assert_eq!(item["delete"]["operationId"], "deleteSchoolsById");
        // the delete success response reuses the Updated component
        assert_eq!(
            item["delete"]["responses"]["204"]["$ref"],
            "#/components/responses/Updated"
        );
    }

    #[test]
    fn test_query_parameters_carry_identity_marker() {
        let fixture = Fixture::build(school_builder());
        let document = fixture.generator().resources_document().unwrap();

        let parameters = document["paths"]["/edfi/schools"]["get"]["parameters"]
            .as_array()
            .unwrap();
        assert_eq!(parameters[0]["$ref"], "#/components/parameters/offset");

        let school_id = parameters
            .iter()
            .find(|p| p["name"] == "schoolId")
            .expect("schoolId query parameter");
        assert_eq!(school_id["x-Ed-Fi-isIdentity"], true);
        assert_eq!(school_id["schema"], serde_json::json!({ "type": "integer", "format": "int32" }));

        // references and collections do not become query parameters
        assert!(parameters.iter().all(|p| p["name"] != "gradeLevels"));
    }

    #[test]
    fn test_request_body_and_collection_components() {
        let fixture = Fixture::build(school_builder());
        let document = fixture.generator().resources_document().unwrap();
        let schemas = &document["components"]["schemas"];

        let body = &schemas["EdFi_School"];
        assert_eq!(body["properties"]["schoolId"]["x-Ed-Fi-isIdentity"], true);
        assert_eq!(body["required"], serde_json::json!(["schoolId", "nameOfInstitution"]));
        assert_eq!(
            body["properties"]["gradeLevels"]["items"]["$ref"],
            "#/components/schemas/EdFi_School_GradeLevel"
        );
        assert_eq!(
            schemas["EdFi_School_GradeLevel"]["required"],
            serde_json::json!(["gradeLevelDescriptor"])
        );

        let reference = &schemas["EdFi_School_Reference"];
        assert_eq!(reference["required"], serde_json::json!(["schoolId"]));
    }

    #[test]
    fn test_reference_collection_component_refs_target_reference() {
        let mut builder = GraphBuilder::new("EdFi");
        builder
            .domain_entity("ClassPeriod", "doc")
            .string_identity("ClassPeriodName", "doc", Some(60), None);
        builder
            .domain_entity("Section", "doc")
            .string_identity("SectionIdentifier", "doc", Some(255), None)
            .domain_entity_reference("ClassPeriod", "doc", true, true);
        let fixture = Fixture::build(builder);
        let document = fixture.generator().resources_document().unwrap();
        let schemas = &document["components"]["schemas"];

        assert_eq!(
            schemas["EdFi_Section"]["properties"]["classPeriods"]["items"]["$ref"],
            "#/components/schemas/EdFi_Section_ClassPeriod"
        );
        assert_eq!(
            schemas["EdFi_Section_ClassPeriod"]["properties"]["classPeriodReference"]["$ref"],
            "#/components/schemas/EdFi_ClassPeriod_Reference"
        );
    }

    #[test]
    fn test_descriptors_document_is_separate() {
        let fixture = Fixture::build(school_builder());
        let generator = fixture.generator();
        let resources = generator.resources_document().unwrap();
        let descriptors = generator.descriptors_document().unwrap();

        assert!(resources["paths"].get("/edfi/gradeLevelDescriptors").is_none());
        let collection = &descriptors["paths"]["/edfi/gradeLevelDescriptors"];
        assert_eq!(collection["get"]["operationId"], "getGradeLevelDescriptors");
        assert_eq!(collection["post"]["operationId"], "postGradeLevelDescriptor");

        let body = &descriptors["components"]["schemas"]["EdFi_GradeLevelDescriptor"];
        assert_eq!(body["required"], serde_json::json!(["codeValue", "namespace", "shortDescription"]));

        let parameters = collection["get"]["parameters"].as_array().unwrap();
        assert!(parameters.iter().any(|p| p["name"] == "codeValue"));
    }

    #[test]
    fn test_tags_are_sorted_by_name() {
        let mut builder = GraphBuilder::new("EdFi");
        builder.domain_entity("Session", "Session doc").string_identity("SessionName", "doc", Some(60), None);
        builder.domain_entity("Assessment", "Assessment doc").integer_identity("AssessmentIdentifier", "doc");
        let fixture = Fixture::build(builder);
        let document = fixture.generator().resources_document().unwrap();

        let tags = document["tags"].as_array().unwrap();
        assert_eq!(tags[0]["name"], "assessments");
        assert_eq!(tags[1]["name"], "sessions");
        assert_eq!(tags[0]["description"], "Assessment doc");
    }
}
