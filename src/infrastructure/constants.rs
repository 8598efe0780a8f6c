// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Field manager used for server-side apply.
pub const FIELD_MANAGER: &str = "paas-deploy";

pub const LABEL_APP: &str = "app";
pub const LABEL_ENVIRONMENT: &str = "paas.io/environment";
pub const LABEL_JOB: &str = "paas.io/job";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "paas-deploy";

pub const SUFFIX_DEPLOYMENT: &str = "-dplmt";
pub const SUFFIX_INGRESS: &str = "-ingress";
pub const SUFFIX_SECRET: &str = "-secret";
pub const SUFFIX_PVC: &str = "-pvc";

pub const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";
pub const RESTART_POLICY_ALWAYS: &str = "Always";
pub const STRATEGY_TYPE_ROLLING_UPDATE: &str = "RollingUpdate";
pub const MAX_UNAVAILABLE: &str = "25%";
pub const MAX_SURGE: &str = "25%";

pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

/// Secrets with this provider are written as Kubernetes secrets.
pub const SECRET_PROVIDER_MAP: &str = "map";
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";
pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

pub const PATH_TYPE_PREFIX: &str = "Prefix";

/// Where init containers stage imported volumes.
pub const IMPORT_STAGING_PATH: &str = "/paas-import";
pub const IMPORT_INIT_PREFIX: &str = "import-";
