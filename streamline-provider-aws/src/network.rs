//! Network boundary - VPC, subnets carved per zone, gateways and routes

use ipnet::Ipv4Net;
use streamline_core::{Resource, Value};

use crate::config::{NetworkConfig, SubnetLayout, SubnetType};
use crate::error::StackError;
use crate::resources as rt;

/// Upper bound on zones a network spreads across
pub const MAX_AZS: usize = 6;

/// Tag recording whether a subnet is public or private
pub const SUBNET_TYPE_TAG: &str = "streamline:subnet-type";

const ANY_IPV4: &str = "0.0.0.0/0";

/// A subnet declared by a network boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Subnet {
    pub logical_id: String,
    pub subnet_type: SubnetType,
    /// Zone index within the region
    pub zone: usize,
    pub cidr: String,
}

impl Subnet {
    pub fn reference(&self) -> Value {
        Value::Ref(self.logical_id.clone())
    }
}

fn parse_block(cidr: &str) -> Result<Ipv4Net, StackError> {
    let invalid = |reason: &str| StackError::InvalidCidr {
        cidr: cidr.to_string(),
        reason: reason.to_string(),
    };

    let block: Ipv4Net = cidr.parse().map_err(|_| invalid("expected IPv4 address/prefix"))?;
    if block.addr() != block.network() {
        return Err(invalid("host bits are set"));
    }
    Ok(block)
}

/// Isolated virtual network of a stack
#[derive(Debug, Clone)]
pub struct NetworkBoundary {
    pub logical_id: String,
    pub cidr: String,
    prefix: String,
    subnets: Vec<Subnet>,
    resources: Vec<Resource>,
}

impl NetworkBoundary {
    /// Declare a network; `name` is the logical ID prefix of every resource
    pub fn declare(name: &str, config: &NetworkConfig) -> Result<Self, StackError> {
        let block = parse_block(&config.cidr)?;
        let zones = config.max_azs;
        if zones == 0 || zones > MAX_AZS {
            return Err(StackError::ZoneCount {
                count: zones,
                max: MAX_AZS,
            });
        }

        let nat_count = config.nat_gateway_count();
        let private = config.subnet_layout == SubnetLayout::PrivateWithNat;
        if private && nat_count == 0 {
            return Err(StackError::NatCount {
                count: 0,
                reason: "private subnets need at least one NAT gateway".to_string(),
            });
        }
        if !private && nat_count > 0 {
            return Err(StackError::NatCount {
                count: nat_count,
                reason: "a public-only network has no private subnets to route".to_string(),
            });
        }
        if nat_count > zones {
            return Err(StackError::NatCount {
                count: nat_count,
                reason: format!("at most one per zone ({})", zones),
            });
        }

        let mask = config.cidr_mask;
        if mask < block.prefix_len() || mask > 28 {
            return Err(StackError::InvalidCidr {
                cidr: config.cidr.clone(),
                reason: format!(
                    "subnet mask /{} must be between /{} and /28",
                    mask,
                    block.prefix_len()
                ),
            });
        }
        let requested = if private { zones * 2 } else { zones };
        let space_error = || StackError::SubnetSpace {
            cidr: config.cidr.clone(),
            requested,
            mask,
        };
        let carved: Vec<Ipv4Net> = block
            .subnets(mask)
            .map_err(|_| space_error())?
            .take(requested)
            .collect();
        if carved.len() < requested {
            return Err(space_error());
        }
        let mut carved = carved.into_iter().map(|net| net.to_string());

        let mut network = Self {
            logical_id: format!("{}Vpc", name),
            cidr: config.cidr.clone(),
            prefix: name.to_string(),
            subnets: Vec::new(),
            resources: Vec::new(),
        };

        for zone in 0..zones {
            network.subnets.push(Subnet {
                logical_id: format!("{}PublicSubnet{}", name, zone + 1),
                subnet_type: SubnetType::Public,
                zone,
                cidr: carved.next().ok_or_else(space_error)?,
            });
        }
        if private {
            for zone in 0..zones {
                network.subnets.push(Subnet {
                    logical_id: format!("{}PrivateSubnet{}", name, zone + 1),
                    subnet_type: SubnetType::Private,
                    zone,
                    cidr: carved.next().ok_or_else(space_error)?,
                });
            }
        }

        network.declare_resources(nat_count);
        log::debug!(
            "network {} declares {} subnets and {} NAT gateways",
            network.logical_id,
            network.subnets.len(),
            nat_count
        );
        Ok(network)
    }

    fn declare_resources(&mut self, nat_count: usize) {
        let vpc_id = Value::Ref(self.logical_id.clone());
        let igw_id = format!("{}InternetGateway", self.prefix);
        let attachment_id = format!("{}GatewayAttachment", self.prefix);

        let mut resources = vec![
            Resource::new(rt::VPC, &self.logical_id)
                .with_attribute("cidr_block", self.cidr.as_str())
                .with_attribute("enable_dns_hostnames", true)
                .with_attribute("enable_dns_support", true)
                .with_attribute("instance_tenancy", "default")
                .with_attribute("tags", name_tags(&self.logical_id, &[])),
            Resource::new(rt::INTERNET_GATEWAY, &igw_id)
                .with_attribute("tags", name_tags(&igw_id, &[])),
            Resource::new(rt::VPC_GATEWAY_ATTACHMENT, &attachment_id)
                .with_attribute("vpc_id", vpc_id.clone())
                .with_attribute("internet_gateway_id", Value::Ref(igw_id.clone())),
        ];

        let public: Vec<&Subnet> = self.subnets_of_type(SubnetType::Public).collect();
        let nat_ids: Vec<String> = public
            .iter()
            .take(nat_count)
            .map(|s| format!("{}NatGateway", s.logical_id))
            .collect();

        for subnet in &self.subnets {
            let table_id = format!("{}RouteTable", subnet.logical_id);
            let public_subnet = subnet.subnet_type == SubnetType::Public;

            resources.push(
                Resource::new(rt::SUBNET, &subnet.logical_id)
                    .with_attribute("vpc_id", vpc_id.clone())
                    .with_attribute("cidr_block", subnet.cidr.as_str())
                    .with_attribute("availability_zone", Value::AvailabilityZone(subnet.zone))
                    .with_attribute("map_public_ip_on_launch", public_subnet)
                    .with_attribute(
                        "tags",
                        name_tags(
                            &subnet.logical_id,
                            &[(SUBNET_TYPE_TAG, subnet.subnet_type.to_string())],
                        ),
                    ),
            );
            resources.push(
                Resource::new(rt::ROUTE_TABLE, &table_id)
                    .with_attribute("vpc_id", vpc_id.clone())
                    .with_attribute("tags", name_tags(&table_id, &[])),
            );
            resources.push(
                Resource::new(
                    rt::SUBNET_ROUTE_TABLE_ASSOCIATION,
                    format!("{}RouteTableAssociation", subnet.logical_id),
                )
                .with_attribute("subnet_id", subnet.reference())
                .with_attribute("route_table_id", Value::Ref(table_id.clone())),
            );

            let route = Resource::new(rt::ROUTE, format!("{}DefaultRoute", subnet.logical_id))
                .with_attribute("route_table_id", Value::Ref(table_id.clone()))
                .with_attribute("destination_cidr_block", ANY_IPV4);
            let route = if public_subnet {
                route
                    .with_attribute("gateway_id", Value::Ref(igw_id.clone()))
                    .with_dependency(&attachment_id)
            } else {
                // Round-robin when there are fewer NAT gateways than zones
                let nat_id = &nat_ids[subnet.zone % nat_ids.len()];
                route.with_attribute("nat_gateway_id", Value::Ref(nat_id.clone()))
            };
            resources.push(route);
        }

        for (subnet, nat_id) in public.iter().zip(&nat_ids) {
            let eip_id = format!("{}Eip", subnet.logical_id);
            resources.push(
                Resource::new(rt::EIP, &eip_id)
                    .with_attribute("domain", "vpc")
                    .with_attribute("tags", name_tags(&eip_id, &[]))
                    .with_dependency(&attachment_id),
            );
            resources.push(
                Resource::new(rt::NAT_GATEWAY, nat_id)
                    .with_attribute("subnet_id", subnet.reference())
                    .with_attribute("allocation_id", Value::attr(&eip_id, "AllocationId"))
                    .with_attribute("tags", name_tags(nat_id, &[])),
            );
        }

        self.resources = resources;
    }

    /// Reference to the VPC ID
    pub fn vpc_id(&self) -> Value {
        Value::Ref(self.logical_id.clone())
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }

    pub fn subnets_of_type(&self, subnet_type: SubnetType) -> impl Iterator<Item = &Subnet> {
        self.subnets
            .iter()
            .filter(move |s| s.subnet_type == subnet_type)
    }

    pub fn declares_subnet(&self, logical_id: &str) -> bool {
        self.subnets.iter().any(|s| s.logical_id == logical_id)
    }

    pub fn nat_gateway_count(&self) -> usize {
        self.resources
            .iter()
            .filter(|r| r.id.resource_type == rt::NAT_GATEWAY)
            .count()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

fn name_tags(name: &str, extra: &[(&str, String)]) -> Value {
    let mut tags = vec![("Name".to_string(), Value::from(name))];
    tags.extend(extra.iter().map(|(k, v)| (k.to_string(), Value::from(v.as_str()))));
    Value::map(tags)
}
