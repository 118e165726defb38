use std::any::type_name;

/// Lease configuration requested by a service for its registration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LeaseConfig {
    /// Requested time-to-live, in seconds. Must be at least 1.
    pub ttl_seconds: u64,
}

/// One entry of a service's declarative endpoint table.
///
/// Endpoints are declared at service-definition time; nothing is discovered
/// by runtime introspection. Declaration order matters: the first declared
/// endpoint is the one the lifecycle sequencer drives into serve.
#[derive(Clone, Debug)]
pub struct EndpointSpec {
    name: String,
    request_type: &'static str,
    streaming: bool,
}

impl EndpointSpec {
    /// Declares a request/response endpoint with request type `Req`.
    pub fn unary<Req>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request_type: type_name::<Req>(),
            streaming: false,
        }
    }

    /// Declares a streaming endpoint with request type `Req`.
    pub fn streaming<Req>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request_type: type_name::<Req>(),
            streaming: true,
        }
    }

    /// The endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared request type name.
    #[must_use]
    pub const fn request_type(&self) -> &'static str {
        self.request_type
    }

    /// Whether the handler produces a response element sequence.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }
}

/// One entry of a service's declarative startup hook table.
#[derive(Clone, Debug)]
pub struct HookSpec {
    name: String,
    order: u32,
}

impl HookSpec {
    /// Declares a startup hook with an explicit execution order.
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }

    /// The hook name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The hook's position in the execution order.
    #[must_use]
    pub const fn order(&self) -> u32 {
        self.order
    }
}

/// Declarative description of one logical service: its identity, lease
/// configuration, endpoint and hook tables, and dependency edges.
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    name: String,
    namespace: String,
    component: String,
    distributed: bool,
    lease: Option<LeaseConfig>,
    endpoints: Vec<EndpointSpec>,
    hooks: Vec<HookSpec>,
    dependencies: Vec<String>,
}

impl ServiceDescriptor {
    /// Starts building a descriptor for the named service.
    pub fn builder(name: impl Into<String>) -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder {
            name: name.into(),
            namespace: "default".to_string(),
            component: None,
            distributed: true,
            lease: None,
            endpoints: Vec::new(),
            hooks: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// The service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace the service registers under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The component name within the namespace.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Whether this service is a distributed component. Decided once at
    /// definition time; non-distributed services are served elsewhere.
    #[must_use]
    pub const fn is_distributed(&self) -> bool {
        self.distributed
    }

    /// The custom lease configuration, if any.
    #[must_use]
    pub const fn lease(&self) -> Option<LeaseConfig> {
        self.lease
    }

    /// The declared endpoint table, in declaration order.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointSpec] {
        &self.endpoints
    }

    /// The declared startup hooks, sorted by execution order.
    #[must_use]
    pub fn hooks(&self) -> &[HookSpec] {
        &self.hooks
    }

    /// Names of the services this service depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Builder for [`ServiceDescriptor`].
#[derive(Debug)]
pub struct ServiceDescriptorBuilder {
    name: String,
    namespace: String,
    component: Option<String>,
    distributed: bool,
    lease: Option<LeaseConfig>,
    endpoints: Vec<EndpointSpec>,
    hooks: Vec<HookSpec>,
    dependencies: Vec<String>,
}

impl ServiceDescriptorBuilder {
    /// Sets the registration namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the component name. Defaults to the service name.
    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Marks the service as distributed or not. Defaults to distributed.
    #[must_use]
    pub const fn distributed(mut self, distributed: bool) -> Self {
        self.distributed = distributed;
        self
    }

    /// Requests a custom lease with the given ttl.
    #[must_use]
    pub const fn lease_ttl(mut self, ttl_seconds: u64) -> Self {
        self.lease = Some(LeaseConfig { ttl_seconds });
        self
    }

    /// Adds an endpoint table entry.
    #[must_use]
    pub fn endpoint(mut self, spec: EndpointSpec) -> Self {
        self.endpoints.push(spec);
        self
    }

    /// Adds a startup hook table entry.
    #[must_use]
    pub fn hook(mut self, name: impl Into<String>, order: u32) -> Self {
        self.hooks.push(HookSpec::new(name, order));
        self
    }

    /// Adds a dependency edge to another registered service.
    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Finalizes the descriptor. Hooks are sorted by their declared order
    /// here, once; nothing re-sorts at run time.
    #[must_use]
    pub fn build(self) -> ServiceDescriptor {
        let mut hooks = self.hooks;
        hooks.sort_by_key(HookSpec::order);

        ServiceDescriptor {
            component: self.component.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            namespace: self.namespace,
            distributed: self.distributed,
            lease: self.lease,
            endpoints: self.endpoints,
            hooks,
            dependencies: self.dependencies,
        }
    }
}
