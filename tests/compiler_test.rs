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

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use paas_deploy::domain::compiler::ImageDefinition;
    use paas_deploy::domain::config::CompilerConf;
    use paas_deploy::domain::deployment::{Buildable, EnvValue, ImagePath, Volume};
    use paas_deploy::*;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    const JOB: &str = r#"{
        "id": "job-7",
        "project": {"id": "shop", "name": "Shop"},
        "environment": {"name": "prod"},
        "source_repository": {"type": "git", "pull_url": "https://git.example.com/shop.git"},
        "images_repository": {"type": "registry", "api_url": "registry.example.com"},
        "variables": {"DOMAIN": "shop.example.com"}
    }"#;

    #[derive(Debug, Default)]
    struct NoopHook;

    #[async_trait]
    impl Hook for NoopHook {
        fn set_path(&mut self, _path: &Path) {}

        fn set_options(&mut self, _options: &serde_yaml::Value) -> Result<()> {
            Ok(())
        }

        async fn run(&self) -> Result<()> {
            Ok(())
        }
    }

    fn compilers() -> Arc<CompilerCollection> {
        let registry = HookRegistry::new().with("composer", || Box::new(NoopHook));
        Arc::new(CompilerCollection::new(
            BTreeMap::new(),
            Arc::new(registry),
            CompilerConf::default(),
        ))
    }

    fn library_conductor(manifest: &str) -> Conductor {
        let library = BTreeMap::from([(
            "php".to_string(),
            ImageDefinition {
                build_name: Some("php-fpm".to_string()),
                tag: Some("8.3".to_string()),
                path: Some("/opt/paas/images/php".to_string()),
                ..Default::default()
            },
        )]);
        let registry = HookRegistry::new().with("composer", || Box::new(NoopHook));
        let compilers = CompilerCollection::new(library, Arc::new(registry), CompilerConf::default());
        let mut conductor = Conductor::new(Arc::new(compilers));
        conductor.configure(JobUnit::from_json(JOB).unwrap());
        conductor.prepare(manifest).unwrap();
        conductor
    }

    fn conductor(manifest: &str) -> Conductor {
        let mut conductor = Conductor::new(compilers());
        conductor.configure(JobUnit::from_json(JOB).unwrap());
        conductor.prepare(manifest).unwrap();
        conductor
    }

    #[test]
    fn test_single_image_and_pod() {
        let manifest = r#"
paas.version: v1
images:
  app:
    build-name: foo
    tag: "1.2"
    path: /img
pods:
  web:
    containers:
      main:
        image: foo
"#;
        let deployment = conductor(manifest).compile_deployment().unwrap();

        let buildables: Vec<&Buildable> = deployment.buildables().collect();
        assert_eq!(buildables.len(), 1);
        assert_eq!(buildables[0].name(), "foo");
        assert_eq!(buildables[0].tag(), "1.2");
        match buildables[0] {
            Buildable::Image(image) => {
                assert_eq!(image.path, ImagePath::Workspace(PathBuf::from("img")));
            }
            other => panic!("unexpected buildable {:?}", other),
        }

        let pods: Vec<_> = deployment.pods().collect();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].replicas, 1);
        let container = &pods[0].containers[0];
        assert_eq!(deployment.resolve_image(container).unwrap(), "foo:1.2");
    }

    #[test]
    fn test_import_of_undeclared_volume_fails() {
        let manifest = r#"
paas.version: v1
pods:
  web:
    containers:
      main:
        image: docker.io/library/nginx
        volumes:
          assets:
            from: undeclared
"#;
        let result = conductor(manifest).compile_deployment();
        assert!(matches!(result, Err(PaasError::Reference(_))));
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let manifest = r#"
paas:
  version: v1
secrets:
  db:
    provider: map
    options:
      password: s3cret
images:
  php:
    path: docker/php
volumes:
  assets:
    add: [public]
pods:
  app:
    replicas: 2
    containers:
      php:
        image: php
        listen: [9000]
        volumes:
          assets:
            from: assets
          config:
            mount-path: /etc/php
            add: [docker/php/conf.d]
        variables:
          MODE: prod
          from-secrets:
            DB_PASSWORD: db.password
services:
  app:
    ports:
      - listen: 9000
ingresses:
  public:
    host: ${DOMAIN}
    service:
      name: app
      port: 9000
builds:
  dependencies:
    composer: install
"#;
        let conductor = conductor(manifest);
        let first = conductor.compile_deployment().unwrap();
        let second = conductor.compile_deployment().unwrap();
        assert_eq!(first, second);

        assert_eq!(first.hooks().len(), 1);
        assert_eq!(first.hooks()[0].name, "dependencies:composer");
        assert_eq!(
            first.ingresses().next().map(|i| i.host.as_str()),
            Some("shop.example.com")
        );

        let pod = first.pod("app").unwrap();
        let container = &pod.containers[0];
        assert_eq!(container.image, "php-app-php-job-7");
        match container.volumes.get("assets") {
            Some(Volume::Imported(imported)) => assert_eq!(imported.mount_path, "/mnt/assets"),
            other => panic!("unexpected volume {:?}", other),
        }
        match container.variables.get("DB_PASSWORD") {
            Some(EnvValue::Secret(reference)) => assert_eq!(reference.to_string(), "db.password"),
            other => panic!("unexpected variable {:?}", other),
        }
        assert_eq!(first.imported_volumes().count(), 1);
    }

    #[test]
    fn test_unsupported_version_fails() {
        let manifest = r#"
paas.version: v2
images:
  php:
    path: docker/php
"#;
        let result = conductor(manifest).compile_deployment();
        assert!(matches!(result, Err(PaasError::Config(_))));
    }

    #[test]
    fn test_unknown_variable_fails_prepare() {
        let mut conductor = Conductor::new(compilers());
        conductor.configure(JobUnit::from_json(JOB).unwrap());
        let result = conductor.prepare("paas.version: v1\nvolumes:\n  a:\n    add:\n      - ${MISSING}\n");
        assert!(matches!(result, Err(PaasError::Variable(_))));
        assert!(conductor.manifest().is_none());
    }

    #[test]
    fn test_unknown_hook_fails() {
        let manifest = r#"
paas.version: v1
builds:
  assets:
    npm: run build
"#;
        match conductor(manifest).compile_deployment() {
            Err(PaasError::Reference(message)) => assert!(message.contains("npm")),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_container_image_must_be_declared() {
        let manifest = r#"
paas.version: v1
pods:
  web:
    containers:
      main:
        image: missing
"#;
        let result = conductor(manifest).compile_deployment();
        assert!(matches!(result, Err(PaasError::Reference(_))));
    }

    #[test]
    fn test_service_backend_must_exist() {
        let manifest = r#"
paas.version: v1
services:
  api:
    ports:
      - listen: 80
"#;
        let result = conductor(manifest).compile_deployment();
        assert!(matches!(result, Err(PaasError::Reference(_))));
    }

    fn image_path(deployment: &CompiledDeployment, name: &str) -> ImagePath {
        match deployment.buildable(name) {
            Some(Buildable::Image(image)) => image.path.clone(),
            other => panic!("unexpected buildable {:?}", other),
        }
    }

    #[test]
    fn test_library_image_keeps_library_path() {
        let manifest = r#"
paas.version: v1
images:
  php:
    tag: "8.4"
pods:
  app:
    containers:
      fpm:
        image: php-fpm
"#;
        let deployment = library_conductor(manifest).compile_deployment().unwrap();
        assert_eq!(
            image_path(&deployment, "php-fpm"),
            ImagePath::Library(PathBuf::from("/opt/paas/images/php"))
        );
        assert_eq!(deployment.buildable("php-fpm").map(Buildable::tag), Some("8.4"));
    }

    #[test]
    fn test_manifest_path_over_library_image_stays_in_checkout() {
        let manifest = r#"
paas.version: v1
images:
  php:
    path: /etc
"#;
        let deployment = library_conductor(manifest).compile_deployment().unwrap();
        assert_eq!(
            image_path(&deployment, "php-fpm"),
            ImagePath::Workspace(PathBuf::from("etc"))
        );

        let escaping = r#"
paas.version: v1
images:
  php:
    path: ../../..
"#;
        let result = library_conductor(escaping).compile_deployment();
        assert!(matches!(result, Err(PaasError::Reference(_))));
    }

    #[test]
    fn test_inline_volumes_build_an_embedded_image() {
        let manifest = r#"
paas.version: v1
images:
  php:
    path: docker/php
  unused:
    path: docker/unused
pods:
  app:
    containers:
      fpm:
        image: php
        version: "3"
        volumes:
          config:
            mount-path: /etc/php
            add: [docker/php/conf.d]
"#;
        let deployment = conductor(manifest).compile_deployment().unwrap();

        let names: Vec<&str> = deployment.buildables().map(Buildable::name).collect();
        assert_eq!(names, vec!["php", "php-app-fpm-job-7"]);
        assert!(deployment.buildable("unused").is_some());

        match deployment.buildable("php-app-fpm-job-7") {
            Some(Buildable::EmbeddedVolume(embedded)) => {
                assert_eq!(embedded.original, "php");
                assert_eq!(embedded.tag, "3");
                assert_eq!(embedded.volumes[0].paths, vec![PathBuf::from("docker/php/conf.d")]);
                assert_eq!(embedded.volumes[0].image.as_deref(), Some("php-app-fpm-job-7"));
            }
            other => panic!("unexpected buildable {:?}", other),
        }
        let container = &deployment.pod("app").unwrap().containers[0];
        match container.volumes.get("config") {
            Some(Volume::Content(content)) => {
                assert_eq!(content.image.as_deref(), Some("php-app-fpm-job-7"))
            }
            other => panic!("unexpected volume {:?}", other),
        }
        assert_eq!(
            deployment.resolve_image(container).unwrap(),
            "php-app-fpm-job-7:3"
        );
    }

    #[test]
    fn test_variables_fill_numeric_and_boolean_fields() {
        let job = JOB.replace(
            r#""variables": {"DOMAIN": "shop.example.com"}"#,
            r#""variables": {"REPLICAS": "3", "PORT": "8080", "INTERNAL": "false"}"#,
        );
        let manifest = r#"
paas.version: v1
pods:
  web:
    replicas: ${REPLICAS}
    containers:
      main:
        image: docker.io/library/nginx
        listen: ['${PORT}']
services:
  web:
    internal: ${INTERNAL}
    ports:
      - listen: 80
        target: ${PORT}
"#;
        let mut conductor = Conductor::new(compilers());
        conductor.configure(JobUnit::from_json(&job).unwrap());
        conductor.prepare(manifest).unwrap();
        let deployment = conductor.compile_deployment().unwrap();

        let pod = deployment.pod("web").unwrap();
        assert_eq!(pod.replicas, 3);
        assert_eq!(pod.containers[0].listen, vec![8080]);
        let service = deployment.service("web").unwrap();
        assert!(!service.internal);
        assert_eq!(service.ports[0].target, 8080);
    }

    #[test]
    fn test_exclusive_volume_kinds() {
        let manifest = r#"
paas.version: v1
pods:
  web:
    containers:
      main:
        image: docker.io/library/nginx
        volumes:
          data:
            mount-path: /data
            persistent: true
            add: [public]
"#;
        let result = conductor(manifest).compile_deployment();
        assert!(matches!(result, Err(PaasError::Manifest(_))));
    }

    #[test]
    fn test_service_named_pod_must_exist() {
        let manifest = r#"
paas.version: v1
pods:
  web:
    containers:
      main:
        image: docker.io/library/nginx
services:
  api:
    pod: backend
    ports:
      - listen: 80
"#;
        match conductor(manifest).compile_deployment() {
            Err(PaasError::Reference(message)) => assert!(message.contains("backend")),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_ingress_references_are_checked() {
        let base = r#"
paas.version: v1
secrets:
  cert:
    provider: map
    type: tls
pods:
  web:
    containers:
      main:
        image: docker.io/library/nginx
        listen: [80]
services:
  web:
    ports:
      - listen: 80
"#;
        let wrong_port = format!(
            "{}ingresses:\n  public:\n    host: a.example.com\n    service:\n      name: web\n      port: 443\n",
            base
        );
        let result = conductor(&wrong_port).compile_deployment();
        assert!(matches!(result, Err(PaasError::Reference(_))));

        let unknown_tls = format!(
            "{}ingresses:\n  public:\n    host: a.example.com\n    tls:\n      secret: other\n    service:\n      name: web\n      port: 80\n",
            base
        );
        let result = conductor(&unknown_tls).compile_deployment();
        assert!(matches!(result, Err(PaasError::Reference(_))));

        let valid = format!(
            "{}ingresses:\n  public:\n    host: a.example.com\n    tls:\n      secret: cert\n    service:\n      name: web\n      port: 80\n",
            base
        );
        let deployment = conductor(&valid).compile_deployment().unwrap();
        assert_eq!(
            deployment.ingresses().next().and_then(|i| i.tls_secret.as_deref()),
            Some("cert")
        );
    }
}
